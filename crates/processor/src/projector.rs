// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projection of bus traffic onto the relational model.
//!
//! One handler, four message families, each keyed by routing prefix.
//! Session transitions are validated against the core table before any
//! write: an update the table rejects changes nothing and is dropped
//! with a warning. Decode failures are permanent (acked); store failures
//! are transient (retried by the consumer).

use async_trait::async_trait;
use manman_bus::{publish_json, HandlerOutcome, MessageHandler, Publisher, EXCHANGE_EXTERNAL};
use manman_core::{
    Clock, ExternalHostEvent, HostHealthUpdate, HostStatus, HostStatusUpdate,
    InstallationStatusUpdate, RoutingKey, SessionStatusUpdate,
};
use manman_storage::{ProjectionStore, StorageError};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which projection a routing key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFamily {
    Host,
    Health,
    Session,
    Installation,
}

/// Classify a consumed routing key.
pub fn classify_key(routing_key: &str) -> Option<StatusFamily> {
    if routing_key.starts_with("status.host.") {
        Some(StatusFamily::Host)
    } else if routing_key.starts_with("health.host.") {
        Some(StatusFamily::Health)
    } else if routing_key.starts_with("status.session.") {
        Some(StatusFamily::Session)
    } else if routing_key.starts_with("status.workshop.installation.") {
        Some(StatusFamily::Installation)
    } else {
        None
    }
}

#[derive(Debug, Default)]
pub struct ProjectorMetrics {
    pub invalid_transitions: AtomicU64,
    pub decode_failures: AtomicU64,
}

pub struct Projector<C: Clock> {
    store: Arc<dyn ProjectionStore>,
    external: Arc<dyn Publisher>,
    clock: C,
    metrics: Arc<ProjectorMetrics>,
}

impl<C: Clock> Projector<C> {
    pub fn new(store: Arc<dyn ProjectionStore>, external: Arc<dyn Publisher>, clock: C) -> Self {
        Self {
            store,
            external,
            clock,
            metrics: Arc::new(ProjectorMetrics::default()),
        }
    }

    pub fn metrics(&self) -> Arc<ProjectorMetrics> {
        Arc::clone(&self.metrics)
    }

    fn decode<T: DeserializeOwned>(&self, routing_key: &str, payload: &[u8]) -> Option<T> {
        match serde_json::from_slice(payload) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                self.metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(routing_key, error = %e, "dropping undecodable status message");
                None
            }
        }
    }

    async fn project_host_status(&self, update: HostStatusUpdate) -> Result<(), StorageError> {
        self.store
            .update_server_status(update.server_id, update.status, self.clock.utc_now())
            .await?;

        if update.status == HostStatus::Online
            && self.store.ensure_server_capability(update.server_id).await?
        {
            info!(server_id = %update.server_id, "created capability row for first online");
        }

        let _ = publish_json(
            self.external.as_ref(),
            EXCHANGE_EXTERNAL,
            &RoutingKey::external_host(ExternalHostEvent::from(update.status)),
            &update,
        )
        .await;
        Ok(())
    }

    async fn project_health(&self, update: HostHealthUpdate) -> Result<(), StorageError> {
        self.store
            .record_heartbeat(update.server_id, self.clock.utc_now())
            .await
    }

    /// Validate and apply one session status update.
    ///
    /// The first observation of a session is accepted as-is (the host is
    /// authoritative); after that, only transitions the core table
    /// allows are stored.
    pub async fn project_session_status(
        &self,
        update: SessionStatusUpdate,
    ) -> Result<bool, StorageError> {
        if let Some(current) = self.store.session_status(update.session_id).await? {
            if !current.can_transition(update.status) {
                self.metrics
                    .invalid_transitions
                    .fetch_add(1, Ordering::Relaxed);
                warn!(
                    session_id = %update.session_id,
                    from = %current,
                    to = %update.status,
                    "dropping invalid session transition"
                );
                return Ok(false);
            }
        }

        self.store
            .apply_session_update(&update, self.clock.utc_now())
            .await?;

        if let Some(key) = RoutingKey::external_session(update.status) {
            let _ = publish_json(self.external.as_ref(), EXCHANGE_EXTERNAL, &key, &update).await;
        }
        Ok(true)
    }

    async fn project_installation(
        &self,
        update: InstallationStatusUpdate,
    ) -> Result<(), StorageError> {
        self.store
            .update_installation(
                update.installation_id,
                update.status,
                update.progress_percent,
                update.error_message.as_deref(),
            )
            .await
    }
}

#[async_trait]
impl<C: Clock + 'static> MessageHandler for Projector<C> {
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> HandlerOutcome {
        let Some(family) = classify_key(routing_key) else {
            debug!(routing_key, "ignoring unrecognized routing key");
            return HandlerOutcome::Ack;
        };

        let result = match family {
            StatusFamily::Host => match self.decode(routing_key, payload) {
                Some(update) => self.project_host_status(update).await,
                None => return HandlerOutcome::Ack,
            },
            StatusFamily::Health => match self.decode(routing_key, payload) {
                Some(update) => self.project_health(update).await,
                None => return HandlerOutcome::Ack,
            },
            StatusFamily::Session => match self.decode(routing_key, payload) {
                Some(update) => self.project_session_status(update).await.map(|_| ()),
                None => return HandlerOutcome::Ack,
            },
            StatusFamily::Installation => match self.decode(routing_key, payload) {
                Some(update) => self.project_installation(update).await,
                None => return HandlerOutcome::Ack,
            },
        };

        match result {
            Ok(()) => HandlerOutcome::Ack,
            Err(e) => {
                warn!(routing_key, error = %e, "projection failed, will retry");
                HandlerOutcome::Retry
            }
        }
    }
}

#[cfg(test)]
#[path = "projector_tests.rs"]
mod tests;
