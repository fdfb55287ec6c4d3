// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus message payloads.
//!
//! Message type is carried by the routing key, not by an in-band tag;
//! [`HostCommand::decode`] pairs a parsed command key with its payload.
//! All payloads are plain JSON objects so non-Rust consumers stay easy.

use crate::game::{GameConfigSnapshot, SgcSnapshot};
use crate::id::{AddonId, InstallationId, ServerId, SessionId, SgcId};
use crate::routing::{CommandKind, RoutingKey};
use crate::session::{SessionStats, SessionStatus};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Start one session of one SGC on the receiving host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionCommand {
    pub session_id: SessionId,
    pub sgc_id: SgcId,
    pub game_config: GameConfigSnapshot,
    pub server_game_config: SgcSnapshot,
    /// Stop and remove any container already bound to the SGC first.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSessionCommand {
    pub session_id: SessionId,
    /// Remove without the graceful-stop timeout.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSessionCommand {
    pub session_id: SessionId,
}

/// Write bytes to a running session's stdin. Input is base64 on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendInputCommand {
    pub session_id: SessionId,
    pub input: String,
}

impl SendInputCommand {
    pub fn encode_input(session_id: SessionId, bytes: &[u8]) -> Self {
        Self {
            session_id,
            input: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decode_input(&self) -> Result<Vec<u8>, CommandDecodeError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.input)
            .map_err(|e| CommandDecodeError::Payload(format!("invalid base64 input: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAddonCommand {
    pub installation_id: InstallationId,
    pub sgc_id: SgcId,
    pub addon_id: AddonId,
    /// Steam workshop item id, kept as a string to match the catalog.
    pub workshop_id: String,
    pub steam_app_id: u32,
    /// Path inside the game volume where the addon lands.
    pub install_path: String,
}

/// Commands the host consumes, tagged by routing key.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    StartSession(StartSessionCommand),
    StopSession(StopSessionCommand),
    KillSession(KillSessionCommand),
    SendInput(SendInputCommand),
    DownloadAddon(DownloadAddonCommand),
}

impl HostCommand {
    /// The session this command serializes against, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            HostCommand::StartSession(c) => Some(c.session_id),
            HostCommand::StopSession(c) => Some(c.session_id),
            HostCommand::KillSession(c) => Some(c.session_id),
            HostCommand::SendInput(c) => Some(c.session_id),
            HostCommand::DownloadAddon(_) => None,
        }
    }

    /// Decode a payload according to its routing key.
    ///
    /// Both failure modes are permanent: an unknown key and a malformed
    /// payload will be equally malformed on redelivery.
    pub fn decode(routing_key: &str, payload: &[u8]) -> Result<Self, CommandDecodeError> {
        let (_, kind) = RoutingKey::parse_command(routing_key).ok_or_else(|| {
            CommandDecodeError::UnknownRoutingKey(routing_key.to_string())
        })?;
        let decoded = match kind {
            CommandKind::SessionStart => {
                HostCommand::StartSession(serde_json::from_slice(payload)?)
            }
            CommandKind::SessionStop => HostCommand::StopSession(serde_json::from_slice(payload)?),
            CommandKind::SessionKill => HostCommand::KillSession(serde_json::from_slice(payload)?),
            CommandKind::SessionSendInput => {
                HostCommand::SendInput(serde_json::from_slice(payload)?)
            }
            CommandKind::WorkshopDownload => {
                HostCommand::DownloadAddon(serde_json::from_slice(payload)?)
            }
        };
        Ok(decoded)
    }
}

/// Permanent decode failure; ack and log, never retry.
#[derive(Debug, Error)]
pub enum CommandDecodeError {
    #[error("unknown routing key: {0}")]
    UnknownRoutingKey(String),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Payload(String),
}

/// Host liveness as published on `status.host.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Online,
    Offline,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Online => "online",
            HostStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStatusUpdate {
    pub server_id: ServerId,
    pub status: HostStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusUpdate {
    pub session_id: SessionId,
    pub sgc_id: SgcId,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostHealthUpdate {
    pub server_id: ServerId,
    pub session_stats: SessionStats,
}

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Stdout,
    Stderr,
    /// Host-side lifecycle events injected into the session log.
    System,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Stdout => "stdout",
            LogSource::Stderr => "stderr",
            LogSource::System => "system",
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log line on `logs.session.{id}`, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogLine {
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallationStatus {
    Pending,
    Downloading,
    Installed,
    Failed,
    Removed,
}

impl InstallationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallationStatus::Pending => "pending",
            InstallationStatus::Downloading => "downloading",
            InstallationStatus::Installed => "installed",
            InstallationStatus::Failed => "failed",
            InstallationStatus::Removed => "removed",
        }
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationStatusUpdate {
    pub installation_id: InstallationId,
    pub status: InstallationStatus,
    pub progress_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
