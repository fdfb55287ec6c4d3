// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory repository fakes for tests.

use crate::error::StorageError;
use crate::records::{LogReferenceRecord, LogReferenceState, ServerRecord, SessionRecord};
use crate::repo::{LogReferenceStore, ProjectionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use manman_core::{
    HostStatus, InstallationId, InstallationStatus, ServerId, SessionId, SessionStatus,
    SessionStatusUpdate, SgcId,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Map-backed [`ProjectionStore`] mirroring the Postgres semantics.
#[derive(Default)]
pub struct MemoryProjectionStore {
    servers: Mutex<HashMap<ServerId, ServerRecord>>,
    capabilities: Mutex<HashSet<ServerId>>,
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    sgc_servers: Mutex<HashMap<SgcId, ServerId>>,
    installations: Mutex<HashMap<InstallationId, (InstallationStatus, u8, Option<String>)>>,
}

impl MemoryProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a server row (self-registration is out of band in production).
    pub fn seed_server(&self, server_id: ServerId, status: HostStatus, last_seen: DateTime<Utc>) {
        self.servers.lock().insert(
            server_id,
            ServerRecord {
                id: server_id.as_i64(),
                name: format!("server-{server_id}"),
                environment: "test".to_string(),
                status,
                last_seen: Some(last_seen),
            },
        );
    }

    /// Seed the SGC -> server link normally owned by the CRUD plane.
    pub fn seed_sgc(&self, sgc_id: SgcId, server_id: ServerId) {
        self.sgc_servers.lock().insert(sgc_id, server_id);
    }

    pub fn server(&self, server_id: ServerId) -> Option<ServerRecord> {
        self.servers.lock().get(&server_id).cloned()
    }

    pub fn session(&self, session_id: SessionId) -> Option<SessionRecord> {
        self.sessions.lock().get(&session_id).cloned()
    }

    pub fn installation(
        &self,
        installation_id: InstallationId,
    ) -> Option<(InstallationStatus, u8, Option<String>)> {
        self.installations.lock().get(&installation_id).cloned()
    }

    pub fn has_capability(&self, server_id: ServerId) -> bool {
        self.capabilities.lock().contains(&server_id)
    }
}

#[async_trait]
impl ProjectionStore for MemoryProjectionStore {
    async fn update_server_status(
        &self,
        server_id: ServerId,
        status: HostStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if let Some(server) = self.servers.lock().get_mut(&server_id) {
            server.status = status;
            server.last_seen = Some(seen_at);
        }
        Ok(())
    }

    async fn record_heartbeat(
        &self,
        server_id: ServerId,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if let Some(server) = self.servers.lock().get_mut(&server_id) {
            server.last_seen = Some(seen_at);
            if server.status == HostStatus::Offline {
                server.status = HostStatus::Online;
            }
        }
        Ok(())
    }

    async fn mark_server_offline(&self, server_id: ServerId) -> Result<(), StorageError> {
        if let Some(server) = self.servers.lock().get_mut(&server_id) {
            server.status = HostStatus::Offline;
        }
        Ok(())
    }

    async fn ensure_server_capability(&self, server_id: ServerId) -> Result<bool, StorageError> {
        Ok(self.capabilities.lock().insert(server_id))
    }

    async fn session_status(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionStatus>, StorageError> {
        Ok(self.sessions.lock().get(&session_id).map(|s| s.status))
    }

    async fn apply_session_update(
        &self,
        update: &SessionStatusUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(update.session_id).or_insert(SessionRecord {
            id: update.session_id,
            sgc_id: update.sgc_id,
            status: update.status,
            started_at: None,
            ended_at: None,
            exit_code: None,
        });
        session.status = update.status;
        if update.status == SessionStatus::Running && session.started_at.is_none() {
            session.started_at = Some(at);
        }
        if update.status.is_terminal() {
            session.ended_at = Some(at);
            session.exit_code = update.exit_code;
        }
        Ok(())
    }

    async fn stale_online_servers(
        &self,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<ServerId>, StorageError> {
        let cutoff = now
            - chrono::Duration::from_std(threshold)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(self
            .servers
            .lock()
            .values()
            .filter(|s| s.status == HostStatus::Online)
            .filter(|s| s.last_seen.map(|seen| seen < cutoff).unwrap_or(true))
            .map(|s| ServerId::new(s.id))
            .collect())
    }

    async fn live_sessions_for_server(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<(SessionId, SgcId)>, StorageError> {
        let sgc_servers = self.sgc_servers.lock();
        Ok(self
            .sessions
            .lock()
            .values()
            .filter(|s| s.status.is_live())
            .filter(|s| sgc_servers.get(&s.sgc_id) == Some(&server_id))
            .map(|s| (s.id, s.sgc_id))
            .collect())
    }

    async fn update_installation(
        &self,
        installation_id: InstallationId,
        status: InstallationStatus,
        progress_percent: u8,
        error_message: Option<&str>,
    ) -> Result<(), StorageError> {
        self.installations.lock().insert(
            installation_id,
            (status, progress_percent, error_message.map(str::to_string)),
        );
        Ok(())
    }
}

/// Map-backed [`LogReferenceStore`] keyed by (sgc, minute).
#[derive(Default)]
pub struct MemoryLogReferenceStore {
    rows: Mutex<HashMap<(SgcId, DateTime<Utc>), LogReferenceRecord>>,
}

impl MemoryLogReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, sgc_id: SgcId, minute_ts: DateTime<Utc>) -> Option<LogReferenceRecord> {
        self.rows.lock().get(&(sgc_id, minute_ts)).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }
}

#[async_trait]
impl LogReferenceStore for MemoryLogReferenceStore {
    async fn get(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
    ) -> Result<Option<LogReferenceRecord>, StorageError> {
        Ok(self.rows.lock().get(&(sgc_id, minute_ts)).cloned())
    }

    async fn insert_pending(&self, record: &LogReferenceRecord) -> Result<bool, StorageError> {
        let mut rows = self.rows.lock();
        let key = (record.sgc_id, record.minute_ts);
        if rows.contains_key(&key) {
            return Ok(false);
        }
        let mut record = record.clone();
        record.state = LogReferenceState::Pending;
        rows.insert(key, record);
        Ok(true)
    }

    async fn mark_complete(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if let Some(row) = self.rows.lock().get_mut(&(sgc_id, minute_ts)) {
            row.state = LogReferenceState::Complete;
        }
        Ok(())
    }

    async fn mark_appended(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
        added_lines: i64,
        last_log_at: DateTime<Utc>,
        appended_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if let Some(row) = self.rows.lock().get_mut(&(sgc_id, minute_ts)) {
            row.line_count += added_lines;
            row.last_log_at = last_log_at;
            row.appended_at = Some(appended_at);
            row.state = LogReferenceState::Complete;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
