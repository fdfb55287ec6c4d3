// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn line(ts: &str, message: &str) -> LogLine {
    LogLine {
        sgc_id: SgcId::new(55),
        session_id: SessionId::new(100),
        timestamp: ts.parse().unwrap(),
        source: LogSource::Stdout,
        message: message.to_string(),
    }
}

#[test]
fn minute_truncation_drops_seconds_and_nanos() {
    let ts: DateTime<Utc> = "2026-02-10T15:30:59.999Z".parse().unwrap();
    assert_eq!(minute_of(ts).to_rfc3339(), "2026-02-10T15:30:00+00:00");
}

#[test]
fn rollover_at_minute_boundary_splits_windows() {
    // 59.999s stays in the earlier window; 00.000 starts the next.
    let before = line("2026-02-10T15:30:59.999Z", "last");
    let after = line("2026-02-10T15:31:00.000Z", "first");
    let key_before = WindowKey::for_line(&before);
    let key_after = WindowKey::for_line(&after);
    assert_ne!(key_before, key_after);
    assert_eq!(key_before.minute_ts.minute(), 30);
    assert_eq!(key_after.minute_ts.minute(), 31);
}

#[test]
fn lines_keep_arrival_order() {
    let mut window = MinuteWindow::new(&line("2026-02-10T15:30:05Z", "one"));
    window.append(&line("2026-02-10T15:30:15Z", "two"));
    window.append(&line("2026-02-10T15:30:10Z", "three"));

    let content = window.content();
    let one = content.find("one").unwrap();
    let two = content.find("two").unwrap();
    let three = content.find("three").unwrap();
    assert!(one < two && two < three);
    assert_eq!(window.line_count(), 3);
}

#[test]
fn first_and_last_track_extremes_not_arrival() {
    let mut window = MinuteWindow::new(&line("2026-02-10T15:30:15Z", "mid"));
    window.append(&line("2026-02-10T15:30:05Z", "early"));
    window.append(&line("2026-02-10T15:30:30Z", "late"));

    assert_eq!(window.first_log_at, "2026-02-10T15:30:05Z".parse::<DateTime<Utc>>().unwrap());
    assert_eq!(window.last_log_at, "2026-02-10T15:30:30Z".parse::<DateTime<Utc>>().unwrap());
}

#[test]
fn format_includes_timestamp_source_and_message() {
    let formatted = format_line(&line("2026-02-10T15:30:05Z", "hello world"));
    assert_eq!(
        formatted,
        "[2026-02-10T15:30:05+00:00] [stdout] hello world\n"
    );
}
