// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row models for the relational store.
//!
//! Statuses live as lowercase text in the database and convert through
//! the core enums' `FromStr`, keeping the schema free of Postgres enum
//! types (migrations are owned by an external runner).

use chrono::{DateTime, Utc};
use manman_core::{HostStatus, SessionId, SessionStatus, SgcId};
use std::fmt;
use std::str::FromStr;

/// One execution host as the control plane sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    pub id: i64,
    pub name: String,
    pub environment: String,
    pub status: HostStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

/// One session row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: SessionId,
    pub sgc_id: SgcId,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i64>,
}

/// Upload state of a log reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogReferenceState {
    Pending,
    Complete,
}

impl LogReferenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogReferenceState::Pending => "pending",
            LogReferenceState::Complete => "complete",
        }
    }
}

impl fmt::Display for LogReferenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogReferenceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LogReferenceState::Pending),
            "complete" => Ok(LogReferenceState::Complete),
            other => Err(format!("unknown log reference state: {other}")),
        }
    }
}

/// One (sgc, minute) log window in the object store.
///
/// Unique per (sgc_id, minute_ts); a second writer appends to the same
/// object instead of creating a new row.
#[derive(Debug, Clone, PartialEq)]
pub struct LogReferenceRecord {
    pub sgc_id: SgcId,
    pub session_id: SessionId,
    pub object_key: String,
    pub first_log_at: DateTime<Utc>,
    pub last_log_at: DateTime<Utc>,
    pub line_count: i64,
    pub source: String,
    pub minute_ts: DateTime<Utc>,
    pub state: LogReferenceState,
    pub created_at: DateTime<Utc>,
    pub appended_at: Option<DateTime<Utc>>,
}
