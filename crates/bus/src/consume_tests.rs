// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn retry_tracker_allows_up_to_cap() {
    let tracker = RetryTracker::new();
    assert!(tracker.should_retry("k", b"payload", 3));
    assert!(tracker.should_retry("k", b"payload", 3));
    assert!(tracker.should_retry("k", b"payload", 3));
    assert!(!tracker.should_retry("k", b"payload", 3));
}

#[test]
fn retry_counter_resets_after_cap() {
    let tracker = RetryTracker::new();
    assert!(!tracker.should_retry("k", b"p", 0));
    // The entry was removed when the cap fired; the next failure of the
    // same message starts a fresh count.
    assert!(tracker.should_retry("k", b"p", 1));
}

#[test]
fn different_messages_have_independent_counters() {
    let tracker = RetryTracker::new();
    assert!(!tracker.should_retry("k", b"a", 0));
    assert!(tracker.should_retry("k", b"b", 1));
}

#[test]
fn reset_clears_the_counter() {
    let tracker = RetryTracker::new();
    assert!(tracker.should_retry("k", b"p", 1));
    tracker.reset("k", b"p");
    assert!(tracker.should_retry("k", b"p", 1));
}

#[tokio::test]
async fn fake_publisher_records_in_order() {
    use crate::publish::{publish_json, FakePublisher, Publisher};

    let publisher = FakePublisher::new();
    publisher
        .publish("manman", "status.host.7", b"{\"a\":1}".to_vec())
        .await
        .unwrap();
    publish_json(
        &publisher,
        "manman",
        "status.session.100",
        &serde_json::json!({"status": "running"}),
    )
    .await
    .unwrap();

    let messages = publisher.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].routing_key, "status.host.7");
    assert_eq!(messages[1].json()["status"], "running");
    assert_eq!(publisher.with_key("status.host.7").len(), 1);
}
