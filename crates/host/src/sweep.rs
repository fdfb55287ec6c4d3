// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic orphan sweep.
//!
//! The catch-all for crashes between container create and in-memory
//! registration: any labeled container the session table does not know,
//! older than the grace period, is force-removed. The grace period
//! covers host cold starts, where reconciliation may still be adopting.

use crate::metrics::HostMetrics;
use crate::session::SessionTable;
use manman_core::{Clock, ManagedType, ServerId, SessionId};
use manman_docker::{ContainerInfo, ContainerRuntime, ContainerStatus};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Pure selection of sweep victims.
///
/// A container is an orphan when no tracked session references it and
/// its `created_at` label is older than the grace period. Running
/// workshop downloads are exempt (their monitor owns them); finished
/// ones are fair game.
pub fn find_orphans(
    containers: &[ContainerInfo],
    tracked: &HashSet<SessionId>,
    now_epoch_secs: i64,
    grace: Duration,
) -> Vec<ContainerInfo> {
    containers
        .iter()
        .filter(|container| {
            let labels = &container.labels;
            match labels.managed_type {
                ManagedType::Game | ManagedType::Network => {
                    let referenced = labels
                        .session_id
                        .map(|session_id| tracked.contains(&session_id))
                        .unwrap_or(false);
                    !referenced
                }
                ManagedType::WorkshopDownload => container.status != ContainerStatus::Running,
            }
        })
        .filter(|container| {
            now_epoch_secs - container.labels.created_at >= grace.as_secs() as i64
        })
        .cloned()
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_sweeper<C: Clock + 'static>(
    docker: Arc<dyn ContainerRuntime>,
    table: Arc<SessionTable>,
    server_id: ServerId,
    clock: C,
    interval: Duration,
    grace: Duration,
    metrics: Arc<HostMetrics>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }

            let containers = match docker.list_managed(server_id).await {
                Ok(containers) => containers,
                Err(e) => {
                    warn!(error = %e, "orphan sweep could not list containers");
                    continue;
                }
            };

            let tracked: HashSet<SessionId> = table.tracked_ids().into_iter().collect();
            let now_epoch_secs = (clock.epoch_ms() / 1000) as i64;
            let orphans = find_orphans(&containers, &tracked, now_epoch_secs, grace);

            for orphan in orphans {
                info!(
                    container_id = %orphan.id,
                    session_id = ?orphan.labels.session_id,
                    "removing orphaned container"
                );
                // Terminal state is already downstream; no status re-emit.
                if docker.remove_container(&orphan.id, true).await.is_ok() {
                    metrics.orphans_removed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
