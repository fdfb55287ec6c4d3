// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository traits the services program against.

#[cfg(any(test, feature = "test-support"))]
pub(crate) mod memory;
pub(crate) mod postgres;

use crate::error::StorageError;
use crate::records::LogReferenceRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use manman_core::{
    HostStatus, InstallationId, InstallationStatus, ServerId, SessionId, SessionStatus,
    SessionStatusUpdate, SgcId,
};
use std::time::Duration;

/// Projection surface the event processor writes through.
///
/// Every method is one implicit transaction; no transaction spans
/// message boundaries.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Apply a host status update: status + last_seen.
    async fn update_server_status(
        &self,
        server_id: ServerId,
        status: HostStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Heartbeat: always update last_seen; flip status to online only if
    /// the row currently says offline.
    async fn record_heartbeat(
        &self,
        server_id: ServerId,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Flip a server to offline without touching last_seen (stale
    /// marking must not make the host look freshly heard from).
    async fn mark_server_offline(&self, server_id: ServerId) -> Result<(), StorageError>;

    /// Create the capability row on first-ever online. Returns true when
    /// a row was created.
    async fn ensure_server_capability(&self, server_id: ServerId) -> Result<bool, StorageError>;

    /// Current stored status of a session, if the row exists.
    async fn session_status(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionStatus>, StorageError>;

    /// Apply an already-validated session transition: status, started_at
    /// on first `running`, ended_at + exit_code on terminal states.
    async fn apply_session_update(
        &self,
        update: &SessionStatusUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Servers marked online whose last_seen is strictly older than
    /// `now - threshold`.
    async fn stale_online_servers(
        &self,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<ServerId>, StorageError>;

    /// Non-terminal sessions whose SGC belongs to the given server.
    async fn live_sessions_for_server(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<(SessionId, SgcId)>, StorageError>;

    /// Workshop installation progress.
    async fn update_installation(
        &self,
        installation_id: InstallationId,
        status: InstallationStatus,
        progress_percent: u8,
        error_message: Option<&str>,
    ) -> Result<(), StorageError>;
}

/// LogReference surface the archiver writes through.
#[async_trait]
pub trait LogReferenceStore: Send + Sync {
    async fn get(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
    ) -> Result<Option<LogReferenceRecord>, StorageError>;

    /// Insert a new row in `pending` state. Returns false when a row for
    /// (sgc_id, minute_ts) already exists (somebody else won the race).
    async fn insert_pending(&self, record: &LogReferenceRecord) -> Result<bool, StorageError>;

    /// Transition to `complete` after a successful first upload.
    async fn mark_complete(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Record an append: bump line count, extend last_log_at, stamp
    /// appended_at, and ensure the state is `complete`.
    async fn mark_appended(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
        added_lines: i64,
        last_log_at: DateTime<Utc>,
        appended_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}
