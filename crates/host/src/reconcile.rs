// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation.
//!
//! After a host crash, the in-memory table is gone; container labels are
//! the only ground truth. Every container labeled with this server id is
//! classified into a tagged variant and dispatched: running games are
//! re-adopted (re-attach, re-announce), stopped games are finalized,
//! unreferenced networks and finished workshop containers are removed.

use crate::session::SessionManager;
use manman_core::{Clock, ManagedType, ServerId, SessionId, SgcId};
use manman_docker::{ContainerInfo, ContainerRuntime, ContainerStatus, NetworkInfo};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// What reconciliation decided to do with one discovered resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileAction {
    /// Running game container with full labels: re-attach and track.
    AdoptGame {
        container_id: String,
        session_id: SessionId,
        sgc_id: SgcId,
    },
    /// Stopped game container: read exit code, emit terminal status,
    /// remove.
    FinalizeGame {
        container_id: String,
        session_id: SessionId,
        sgc_id: SgcId,
    },
    /// Workshop download still running: leave it, its monitor restarts
    /// on the next download command; finished ones are removed.
    RemoveWorkshop { container_id: String },
    /// Game container with unusable labels: remove, nothing can be
    /// reported for it.
    RemoveUnidentifiable { container_id: String },
    /// Network no surviving session references.
    RemoveNetwork { name: String },
}

/// Pure classification over the label scan.
pub fn classify(
    containers: &[ContainerInfo],
    networks: &[NetworkInfo],
) -> Vec<ReconcileAction> {
    let mut actions = Vec::new();
    let mut kept_sessions: HashSet<SessionId> = HashSet::new();

    for container in containers {
        match container.labels.managed_type {
            ManagedType::Game => {
                match (container.labels.session_id, container.labels.sgc_id) {
                    (Some(session_id), Some(sgc_id)) => {
                        if container.status == ContainerStatus::Running {
                            kept_sessions.insert(session_id);
                            actions.push(ReconcileAction::AdoptGame {
                                container_id: container.id.clone(),
                                session_id,
                                sgc_id,
                            });
                        } else {
                            actions.push(ReconcileAction::FinalizeGame {
                                container_id: container.id.clone(),
                                session_id,
                                sgc_id,
                            });
                        }
                    }
                    _ => actions.push(ReconcileAction::RemoveUnidentifiable {
                        container_id: container.id.clone(),
                    }),
                }
            }
            ManagedType::WorkshopDownload => {
                if container.status != ContainerStatus::Running {
                    actions.push(ReconcileAction::RemoveWorkshop {
                        container_id: container.id.clone(),
                    });
                }
            }
            // Networks never appear in the container list; labels with
            // type network on a container are junk.
            ManagedType::Network => actions.push(ReconcileAction::RemoveUnidentifiable {
                container_id: container.id.clone(),
            }),
        }
    }

    for network in networks {
        let referenced = network
            .labels
            .session_id
            .map(|session_id| kept_sessions.contains(&session_id))
            .unwrap_or(false);
        if !referenced {
            actions.push(ReconcileAction::RemoveNetwork {
                name: network.name.clone(),
            });
        }
    }

    actions
}

/// Scan the daemon and execute the classification.
pub async fn reconcile<C: Clock + 'static>(
    docker: &Arc<dyn ContainerRuntime>,
    manager: &Arc<SessionManager<C>>,
    server_id: ServerId,
) {
    let containers = match docker.list_managed(server_id).await {
        Ok(containers) => containers,
        Err(e) => {
            warn!(error = %e, "reconciliation could not list containers");
            return;
        }
    };
    let networks = match docker.list_managed_networks(server_id).await {
        Ok(networks) => networks,
        Err(e) => {
            warn!(error = %e, "reconciliation could not list networks");
            Vec::new()
        }
    };

    let actions = classify(&containers, &networks);
    if !actions.is_empty() {
        info!(actions = actions.len(), "reconciling labeled resources");
    }

    for action in actions {
        match action {
            ReconcileAction::AdoptGame {
                container_id,
                session_id,
                sgc_id,
            } => {
                manager.adopt_session(session_id, sgc_id, &container_id).await;
            }
            ReconcileAction::FinalizeGame {
                container_id,
                session_id,
                sgc_id,
            } => {
                let exit_code = docker.exit_code(&container_id).await.ok().flatten();
                info!(%session_id, ?exit_code, "finalizing session that ended while host was down");
                let _ = docker.remove_container(&container_id, true).await;
                manager.report_self_exit(session_id, sgc_id, exit_code).await;
            }
            ReconcileAction::RemoveWorkshop { container_id }
            | ReconcileAction::RemoveUnidentifiable { container_id } => {
                let _ = docker.remove_container(&container_id, true).await;
            }
            ReconcileAction::RemoveNetwork { name } => {
                let _ = docker.remove_network(&name).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
