// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container label contract.
//!
//! Labels are the only ground truth the host trusts for reconciliation:
//! in-memory state dies with the process, labels survive on the Docker
//! daemon. Every container and network the host creates carries the full
//! set built here.

use crate::id::{Environment, ServerId, SessionId, SgcId};
use std::collections::HashMap;
use std::fmt;

pub const LABEL_TYPE: &str = "manman.type";
pub const LABEL_SERVER_ID: &str = "manman.server_id";
pub const LABEL_ENVIRONMENT: &str = "manman.environment";
pub const LABEL_SESSION_ID: &str = "manman.session_id";
pub const LABEL_SGC_ID: &str = "manman.sgc_id";
pub const LABEL_CREATED_AT: &str = "manman.created_at";

/// What kind of managed resource a label set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedType {
    Game,
    Network,
    WorkshopDownload,
}

impl ManagedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagedType::Game => "game",
            ManagedType::Network => "network",
            ManagedType::WorkshopDownload => "workshop-download",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "game" => Some(ManagedType::Game),
            "network" => Some(ManagedType::Network),
            "workshop-download" => Some(ManagedType::WorkshopDownload),
            _ => None,
        }
    }
}

impl fmt::Display for ManagedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed (or to-be-written) label set of a managed container or network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLabels {
    pub managed_type: ManagedType,
    pub server_id: ServerId,
    pub environment: Environment,
    pub session_id: Option<SessionId>,
    pub sgc_id: Option<SgcId>,
    /// Unix epoch seconds at creation; drives the orphan-sweep grace period.
    pub created_at: i64,
}

impl ContainerLabels {
    pub fn game(
        server_id: ServerId,
        environment: Environment,
        session_id: SessionId,
        sgc_id: SgcId,
        created_at: i64,
    ) -> Self {
        Self {
            managed_type: ManagedType::Game,
            server_id,
            environment,
            session_id: Some(session_id),
            // Carried on game containers too, so a restarted host can
            // rebuild full status updates from labels alone.
            sgc_id: Some(sgc_id),
            created_at,
        }
    }

    pub fn network(
        server_id: ServerId,
        environment: Environment,
        session_id: SessionId,
        created_at: i64,
    ) -> Self {
        Self {
            managed_type: ManagedType::Network,
            server_id,
            environment,
            session_id: Some(session_id),
            sgc_id: None,
            created_at,
        }
    }

    pub fn workshop(
        server_id: ServerId,
        environment: Environment,
        sgc_id: SgcId,
        created_at: i64,
    ) -> Self {
        Self {
            managed_type: ManagedType::WorkshopDownload,
            server_id,
            environment,
            session_id: None,
            sgc_id: Some(sgc_id),
            created_at,
        }
    }

    /// Render into the map handed to the Docker API.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(LABEL_TYPE.to_string(), self.managed_type.as_str().to_string());
        map.insert(LABEL_SERVER_ID.to_string(), self.server_id.to_string());
        map.insert(
            LABEL_ENVIRONMENT.to_string(),
            self.environment.as_str().to_string(),
        );
        if let Some(session_id) = self.session_id {
            map.insert(LABEL_SESSION_ID.to_string(), session_id.to_string());
        }
        if let Some(sgc_id) = self.sgc_id {
            map.insert(LABEL_SGC_ID.to_string(), sgc_id.to_string());
        }
        map.insert(LABEL_CREATED_AT.to_string(), self.created_at.to_string());
        map
    }

    /// Parse a label map read back from the daemon.
    ///
    /// Returns `None` when the map does not describe a ManMan resource
    /// (missing or unknown `manman.type`, or unparseable required ids).
    /// Missing optional ids parse to `None` rather than failing, so a
    /// half-labeled container still reaches the orphan sweep.
    pub fn parse(labels: &HashMap<String, String>) -> Option<Self> {
        let managed_type = ManagedType::parse(labels.get(LABEL_TYPE)?.as_str())?;
        let server_id = ServerId::new(labels.get(LABEL_SERVER_ID)?.parse().ok()?);
        let environment = Environment::new(labels.get(LABEL_ENVIRONMENT)?.clone());
        let session_id = labels
            .get(LABEL_SESSION_ID)
            .and_then(|v| v.parse().ok())
            .map(SessionId::new);
        let sgc_id = labels
            .get(LABEL_SGC_ID)
            .and_then(|v| v.parse().ok())
            .map(SgcId::new);
        let created_at = labels
            .get(LABEL_CREATED_AT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        Some(Self {
            managed_type,
            server_id,
            environment,
            session_id,
            sgc_id,
            created_at,
        })
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod tests;
