// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed status publication for one host.
//!
//! Wraps the raw [`Publisher`] with the routing keys and payload shapes
//! of this host, so call sites read as what they announce.

use manman_bus::{publish_json, BusError, Publisher, EXCHANGE_MANMAN};
use manman_core::{
    HostHealthUpdate, HostStatus, HostStatusUpdate, InstallationStatus, InstallationStatusUpdate,
    InstallationId, LogSource, RoutingKey, ServerId, SessionId, SessionLogLine, SessionStats,
    SessionStatus, SessionStatusUpdate, SgcId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

pub struct HostPublisher {
    publisher: Arc<dyn Publisher>,
    server_id: ServerId,
}

impl HostPublisher {
    pub fn new(publisher: Arc<dyn Publisher>, server_id: ServerId) -> Self {
        Self {
            publisher,
            server_id,
        }
    }

    pub fn server_id(&self) -> ServerId {
        self.server_id
    }

    pub async fn host_status(&self, status: HostStatus) -> Result<(), BusError> {
        info!(%status, "publishing host status");
        publish_json(
            self.publisher.as_ref(),
            EXCHANGE_MANMAN,
            &RoutingKey::host_status(self.server_id),
            &HostStatusUpdate {
                server_id: self.server_id,
                status,
            },
        )
        .await
    }

    pub async fn session_status(
        &self,
        session_id: SessionId,
        sgc_id: SgcId,
        status: SessionStatus,
        exit_code: Option<i64>,
    ) -> Result<(), BusError> {
        info!(%session_id, %sgc_id, %status, ?exit_code, "publishing session status");
        publish_json(
            self.publisher.as_ref(),
            EXCHANGE_MANMAN,
            &RoutingKey::session_status(session_id),
            &SessionStatusUpdate {
                session_id,
                sgc_id,
                status,
                exit_code,
            },
        )
        .await
    }

    pub async fn health(&self, session_stats: SessionStats) -> Result<(), BusError> {
        publish_json(
            self.publisher.as_ref(),
            EXCHANGE_MANMAN,
            &RoutingKey::host_health(self.server_id),
            &HostHealthUpdate {
                server_id: self.server_id,
                session_stats,
            },
        )
        .await
    }

    /// Fire-and-forget: log lines never fail the caller.
    pub async fn log_line(
        &self,
        session_id: SessionId,
        timestamp: DateTime<Utc>,
        source: LogSource,
        message: String,
    ) {
        let line = SessionLogLine {
            timestamp,
            source,
            message,
        };
        let Ok(payload) = serde_json::to_vec(&line) else {
            return;
        };
        self.publisher
            .publish_lossy(
                EXCHANGE_MANMAN,
                &RoutingKey::session_logs(session_id),
                payload,
            )
            .await;
    }

    pub async fn installation_status(
        &self,
        installation_id: InstallationId,
        status: InstallationStatus,
        progress_percent: u8,
        error_message: Option<String>,
    ) -> Result<(), BusError> {
        publish_json(
            self.publisher.as_ref(),
            EXCHANGE_MANMAN,
            &RoutingKey::installation_status(installation_id),
            &InstallationStatusUpdate {
                installation_id,
                status,
                progress_percent,
                error_message,
            },
        )
        .await
    }
}
