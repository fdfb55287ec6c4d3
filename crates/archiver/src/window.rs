// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minute windows.
//!
//! A line with host-UTC timestamp T belongs to the window keyed by
//! (sgc_id, session_id, T truncated to the minute). Lines keep arrival
//! order; formatting happens at append time so the upload path only
//! concatenates.

use chrono::{DateTime, Timelike, Utc};
use manman_core::{LogSource, SessionId, SgcId};

/// One log line entering the archiver.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub sgc_id: SgcId,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub message: String,
}

/// Truncate a timestamp to its minute boundary.
pub fn minute_of(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Identity of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowKey {
    pub sgc_id: SgcId,
    pub session_id: SessionId,
    pub minute_ts: DateTime<Utc>,
}

impl WindowKey {
    pub fn for_line(line: &LogLine) -> Self {
        Self {
            sgc_id: line.sgc_id,
            session_id: line.session_id,
            minute_ts: minute_of(line.timestamp),
        }
    }
}

/// Render one line in the archived format.
pub fn format_line(line: &LogLine) -> String {
    format!(
        "[{}] [{}] {}\n",
        line.timestamp.to_rfc3339(),
        line.source,
        line.message
    )
}

/// Accumulating buffer for one (sgc, session, minute).
#[derive(Debug, Clone)]
pub struct MinuteWindow {
    pub key: WindowKey,
    lines: Vec<String>,
    pub first_log_at: DateTime<Utc>,
    pub last_log_at: DateTime<Utc>,
    /// Source tag of the first line, recorded on the LogReference row.
    pub source: LogSource,
}

impl MinuteWindow {
    pub fn new(line: &LogLine) -> Self {
        Self {
            key: WindowKey::for_line(line),
            lines: vec![format_line(line)],
            first_log_at: line.timestamp,
            last_log_at: line.timestamp,
            source: line.source,
        }
    }

    pub fn append(&mut self, line: &LogLine) {
        self.lines.push(format_line(line));
        if line.timestamp < self.first_log_at {
            self.first_log_at = line.timestamp;
        }
        if line.timestamp > self.last_log_at {
            self.last_log_at = line.timestamp;
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Concatenated window content, one formatted line per entry.
    pub fn content(&self) -> String {
        self.lines.concat()
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
