// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing-key builders and the per-host command-key parser.
//!
//! Keys are the wire contract; nothing else identifies a message's type.
//! Builders live here so that producers and consumers can never drift.

use crate::id::{InstallationId, ServerId, SessionId};
use crate::message::HostStatus;
use crate::session::SessionStatus;
use std::fmt;

/// Command verbs the host consumes, identified by routing-key suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SessionStart,
    SessionStop,
    SessionKill,
    SessionSendInput,
    WorkshopDownload,
}

impl CommandKind {
    fn suffix(&self) -> &'static str {
        match self {
            CommandKind::SessionStart => "session.start",
            CommandKind::SessionStop => "session.stop",
            CommandKind::SessionKill => "session.kill",
            CommandKind::SessionSendInput => "session.send_input",
            CommandKind::WorkshopDownload => "workshop.download",
        }
    }

    fn parse_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "session.start" => Some(CommandKind::SessionStart),
            "session.stop" => Some(CommandKind::SessionStop),
            "session.kill" => Some(CommandKind::SessionKill),
            "session.send_input" => Some(CommandKind::SessionSendInput),
            "workshop.download" => Some(CommandKind::WorkshopDownload),
            _ => None,
        }
    }
}

/// Host-status verbs re-published on the external exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalHostEvent {
    Online,
    Offline,
    Stale,
}

impl ExternalHostEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalHostEvent::Online => "online",
            ExternalHostEvent::Offline => "offline",
            ExternalHostEvent::Stale => "stale",
        }
    }
}

impl From<HostStatus> for ExternalHostEvent {
    fn from(status: HostStatus) -> Self {
        match status {
            HostStatus::Online => ExternalHostEvent::Online,
            HostStatus::Offline => ExternalHostEvent::Offline,
        }
    }
}

impl fmt::Display for ExternalHostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace for all routing keys and queue names.
pub struct RoutingKey;

impl RoutingKey {
    /// `command.host.{server_id}.{suffix}` — control plane to one host.
    pub fn command(server_id: ServerId, kind: CommandKind) -> String {
        format!("command.host.{server_id}.{}", kind.suffix())
    }

    /// Binding pattern covering every command for one host.
    pub fn command_binding(server_id: ServerId) -> String {
        format!("command.host.{server_id}.#")
    }

    /// Durable per-host command queue name.
    pub fn command_queue(server_id: ServerId) -> String {
        format!("host-{server_id}-commands")
    }

    /// Parse a command routing key into its host and verb.
    pub fn parse_command(key: &str) -> Option<(ServerId, CommandKind)> {
        let rest = key.strip_prefix("command.host.")?;
        let (server_id, suffix) = rest.split_once('.')?;
        let server_id = ServerId::new(server_id.parse().ok()?);
        Some((server_id, CommandKind::parse_suffix(suffix)?))
    }

    pub fn host_status(server_id: ServerId) -> String {
        format!("status.host.{server_id}")
    }

    pub fn session_status(session_id: SessionId) -> String {
        format!("status.session.{session_id}")
    }

    pub fn host_health(server_id: ServerId) -> String {
        format!("health.host.{server_id}")
    }

    pub fn session_logs(session_id: SessionId) -> String {
        format!("logs.session.{session_id}")
    }

    /// Queue (and binding key) for the on-demand log stream of one session.
    pub fn session_log_queue(session_id: SessionId) -> String {
        Self::session_logs(session_id)
    }

    pub fn installation_status(installation_id: InstallationId) -> String {
        format!("status.workshop.installation.{installation_id}")
    }

    /// External fan-out key for host events.
    pub fn external_host(event: ExternalHostEvent) -> String {
        format!("manman.host.{event}")
    }

    /// External fan-out key for the session statuses outside subscribers
    /// care about (running, stopped, crashed). Other statuses return None.
    pub fn external_session(status: SessionStatus) -> Option<String> {
        match status {
            SessionStatus::Running | SessionStatus::Stopped | SessionStatus::Crashed => {
                Some(format!("manman.session.{status}"))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
