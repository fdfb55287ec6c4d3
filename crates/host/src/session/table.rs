// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory session table.
//!
//! This table is a cache, not a source of truth: container labels are
//! what survives a host crash, and reconciliation rebuilds the table
//! from them. Locks are held only for map access; Docker calls never run
//! under the table mutex.

use manman_core::{SessionId, SessionStats, SessionStatus, SgcId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One tracked session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session_id: SessionId,
    pub sgc_id: SgcId,
    pub container_id: Option<String>,
    pub network: Option<String>,
    pub status: SessionStatus,
    /// Set when a stop or kill was requested, so the attach reader's EOF
    /// is not misread as a crash.
    pub stop_requested: bool,
}

#[derive(Default)]
pub struct SessionTable {
    entries: Mutex<HashMap<SessionId, SessionEntry>>,
    /// Per-session command serialization. One handler per session at a
    /// time; the lock is fair, so commands run in arrival order.
    locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: SessionEntry) {
        self.entries.lock().insert(entry.session_id, entry);
    }

    pub fn get(&self, session_id: SessionId) -> Option<SessionEntry> {
        self.entries.lock().get(&session_id).cloned()
    }

    pub fn remove(&self, session_id: SessionId) -> Option<SessionEntry> {
        self.entries.lock().remove(&session_id)
    }

    /// The session currently bound to an SGC, if any.
    pub fn by_sgc(&self, sgc_id: SgcId) -> Option<SessionEntry> {
        self.entries
            .lock()
            .values()
            .find(|entry| entry.sgc_id == sgc_id)
            .cloned()
    }

    pub fn set_status(&self, session_id: SessionId, status: SessionStatus) {
        if let Some(entry) = self.entries.lock().get_mut(&session_id) {
            entry.status = status;
        }
    }

    pub fn set_container(&self, session_id: SessionId, container_id: String) {
        if let Some(entry) = self.entries.lock().get_mut(&session_id) {
            entry.container_id = Some(container_id);
        }
    }

    pub fn set_network(&self, session_id: SessionId, network: String) {
        if let Some(entry) = self.entries.lock().get_mut(&session_id) {
            entry.network = Some(network);
        }
    }

    pub fn mark_stop_requested(&self, session_id: SessionId) {
        if let Some(entry) = self.entries.lock().get_mut(&session_id) {
            entry.stop_requested = true;
        }
    }

    /// Session ids with a tracked entry (any state).
    pub fn tracked_ids(&self) -> Vec<SessionId> {
        self.entries.lock().keys().copied().collect()
    }

    /// Aggregated per-state counts for the heartbeat.
    pub fn stats(&self) -> SessionStats {
        let entries = self.entries.lock();
        let mut stats = SessionStats::default();
        for entry in entries.values() {
            stats.observe(entry.status);
        }
        stats
    }

    /// The serialization lock for one session, created on first use.
    pub fn command_lock(&self, session_id: SessionId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry(session_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
