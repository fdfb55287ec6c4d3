// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle state machine.
//!
//! The transition table here is authoritative for the whole system: the
//! host manager moves its in-memory sessions through it, and the event
//! processor rejects any status update that does not follow it. `lost` is
//! deliberately non-terminal so that a host which reappears after a stale
//! window can still report a late stop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepted by the control plane, not yet picked up by a host.
    Pending,
    /// Host is pulling the image / creating the container.
    Starting,
    /// Container is up and attached.
    Running,
    /// Graceful stop in progress.
    Stopping,
    /// Container exited cleanly after a stop.
    Stopped,
    /// Container exited without a stop command, or startup failed.
    Crashed,
    /// Host went stale while the session was live.
    Lost,
    /// Session finished on its own with exit code 0.
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Crashed => "crashed",
            SessionStatus::Lost => "lost",
            SessionStatus::Completed => "completed",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Stopped | SessionStatus::Crashed | SessionStatus::Completed
        )
    }

    /// Live states are the ones a stale host downgrade applies to.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionStatus::Pending
                | SessionStatus::Starting
                | SessionStatus::Running
                | SessionStatus::Stopping
        )
    }

    /// Whether `self -> to` is an allowed transition.
    ///
    /// `lost -> stopping | stopped` permits late recovery when a host
    /// reconnects after being declared stale.
    pub fn can_transition(&self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        match self {
            Pending => matches!(to, Starting | Crashed | Lost),
            Starting => matches!(to, Running | Crashed | Lost | Stopping),
            Running => matches!(to, Stopping | Crashed | Lost | Completed),
            Stopping => matches!(to, Stopped | Crashed | Lost | Completed),
            Lost => matches!(to, Stopping | Stopped),
            Stopped | Crashed | Completed => false,
        }
    }

    pub fn all() -> [SessionStatus; 8] {
        use SessionStatus::*;
        [
            Pending, Starting, Running, Stopping, Stopped, Crashed, Lost, Completed,
        ]
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "starting" => Ok(SessionStatus::Starting),
            "running" => Ok(SessionStatus::Running),
            "stopping" => Ok(SessionStatus::Stopping),
            "stopped" => Ok(SessionStatus::Stopped),
            "crashed" => Ok(SessionStatus::Crashed),
            "lost" => Ok(SessionStatus::Lost),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// Per-state session counts carried by the host heartbeat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: u32,
    pub pending: u32,
    pub starting: u32,
    pub running: u32,
    pub stopping: u32,
    pub stopped: u32,
    pub crashed: u32,
}

impl SessionStats {
    /// Count one session in the given state.
    pub fn observe(&mut self, status: SessionStatus) {
        self.total += 1;
        match status {
            SessionStatus::Pending => self.pending += 1,
            SessionStatus::Starting => self.starting += 1,
            SessionStatus::Running => self.running += 1,
            SessionStatus::Stopping => self.stopping += 1,
            SessionStatus::Stopped => self.stopped += 1,
            SessionStatus::Crashed => self.crashed += 1,
            // Lost and completed sessions are no longer tracked by a host;
            // they only contribute to the total if still in the table.
            SessionStatus::Lost | SessionStatus::Completed => {}
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
