// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale-host detection.
//!
//! A host that stops heartbeating is marked offline and its live
//! sessions are downgraded to `lost` (legal from every live state).
//! `lost` is recoverable: if the host reappears and reports a late stop,
//! the projector accepts it.

use crate::projector::Projector;
use manman_bus::{publish_json, Publisher, EXCHANGE_EXTERNAL, EXCHANGE_MANMAN};
use manman_core::{
    Clock, ExternalHostEvent, HostStatus, HostStatusUpdate, RoutingKey, ServerId, SessionStatus,
    SessionStatusUpdate,
};
use manman_storage::ProjectionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One detector pass: scan, mark, downgrade, announce.
pub async fn stale_tick<C: Clock>(
    store: &Arc<dyn ProjectionStore>,
    projector: &Projector<C>,
    internal: &Arc<dyn Publisher>,
    external: &Arc<dyn Publisher>,
    clock: &C,
    threshold: Duration,
) {
    let now = clock.utc_now();
    let stale = match store.stale_online_servers(threshold, now).await {
        Ok(stale) => stale,
        Err(e) => {
            warn!(error = %e, "stale scan failed");
            return;
        }
    };

    for server_id in stale {
        info!(%server_id, "host went stale, marking offline");
        if let Err(e) = store.mark_server_offline(server_id).await {
            warn!(%server_id, error = %e, "could not mark server offline");
            continue;
        }

        announce_stale(internal, external, server_id).await;
        downgrade_sessions(store, projector, server_id).await;
    }
}

async fn announce_stale(
    internal: &Arc<dyn Publisher>,
    external: &Arc<dyn Publisher>,
    server_id: ServerId,
) {
    // External subscribers get the dedicated stale event; internal
    // consumers see a regular offline status.
    let _ = publish_json(
        external.as_ref(),
        EXCHANGE_EXTERNAL,
        &RoutingKey::external_host(ExternalHostEvent::Stale),
        &serde_json::json!({ "server_id": server_id, "status": "stale" }),
    )
    .await;
    let _ = publish_json(
        internal.as_ref(),
        EXCHANGE_MANMAN,
        &RoutingKey::host_status(server_id),
        &HostStatusUpdate {
            server_id,
            status: HostStatus::Offline,
        },
    )
    .await;
}

async fn downgrade_sessions<C: Clock>(
    store: &Arc<dyn ProjectionStore>,
    projector: &Projector<C>,
    server_id: ServerId,
) {
    let sessions = match store.live_sessions_for_server(server_id).await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(%server_id, error = %e, "could not list live sessions of stale host");
            return;
        }
    };

    for (session_id, sgc_id) in sessions {
        info!(%session_id, %server_id, "marking session lost");
        let update = SessionStatusUpdate {
            session_id,
            sgc_id,
            status: SessionStatus::Lost,
            exit_code: None,
        };
        if let Err(e) = projector.project_session_status(update).await {
            warn!(%session_id, error = %e, "could not mark session lost");
        }
    }
}

/// Run the detector until cancelled.
#[allow(clippy::too_many_arguments)]
pub fn spawn_stale_detector<C: Clock + 'static>(
    store: Arc<dyn ProjectionStore>,
    projector: Arc<Projector<C>>,
    internal: Arc<dyn Publisher>,
    external: Arc<dyn Publisher>,
    clock: C,
    interval: Duration,
    threshold: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            stale_tick(
                &store,
                projector.as_ref(),
                &internal,
                &external,
                &clock,
                threshold,
            )
            .await;
        }
    })
}

#[cfg(test)]
#[path = "stale_tests.rs"]
mod tests;
