// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command routing.
//!
//! The bus consumer hands every delivery to [`CommandRouter`]. Session
//! commands are dispatched onto per-session worker tasks (bounded queue
//! per session, FIFO, one handler at a time) so commands for one session
//! run in bus order while different sessions proceed concurrently.
//! Workshop downloads go to the orchestrator's queue. Malformed payloads
//! and unknown routing keys are permanent failures: logged and acked.

use crate::metrics::HostMetrics;
use crate::session::SessionManager;
use async_trait::async_trait;
use manman_bus::{HandlerOutcome, MessageHandler};
use manman_core::{Clock, DownloadAddonCommand, HostCommand, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SESSION_QUEUE_CAPACITY: usize = 32;

pub struct CommandRouter<C: Clock + 'static> {
    manager: Arc<SessionManager<C>>,
    workshop_tx: mpsc::Sender<DownloadAddonCommand>,
    session_queues: Mutex<HashMap<SessionId, mpsc::Sender<HostCommand>>>,
    metrics: Arc<HostMetrics>,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> CommandRouter<C> {
    pub fn new(
        manager: Arc<SessionManager<C>>,
        workshop_tx: mpsc::Sender<DownloadAddonCommand>,
        metrics: Arc<HostMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            manager,
            workshop_tx,
            session_queues: Mutex::new(HashMap::new()),
            metrics,
            cancel,
        }
    }

    /// Queue a command onto its session's worker, spawning the worker on
    /// first use. The await here blocks only on this session's bounded
    /// queue, which is the one blocking point the handler path allows.
    async fn dispatch_session(&self, session_id: SessionId, command: HostCommand) -> HandlerOutcome {
        let sender = {
            let mut queues = self.session_queues.lock();
            match queues.get(&session_id) {
                Some(sender) => sender.clone(),
                None => {
                    let (tx, rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
                    spawn_session_worker(
                        Arc::clone(&self.manager),
                        session_id,
                        rx,
                        self.cancel.clone(),
                    );
                    queues.insert(session_id, tx.clone());
                    tx
                }
            }
        };

        match sender.send(command).await {
            Ok(()) => HandlerOutcome::Ack,
            Err(_) => {
                // Worker gone mid-shutdown; let the broker redeliver.
                warn!(%session_id, "session worker queue closed, retrying");
                HandlerOutcome::Retry
            }
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> MessageHandler for CommandRouter<C> {
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> HandlerOutcome {
        let command = match HostCommand::decode(routing_key, payload) {
            Ok(command) => command,
            Err(e) => {
                self.metrics
                    .malformed_commands
                    .fetch_add(1, Ordering::Relaxed);
                warn!(routing_key, error = %e, "dropping undecodable command");
                return HandlerOutcome::Ack;
            }
        };

        match command {
            HostCommand::DownloadAddon(download) => match self.workshop_tx.try_send(download) {
                Ok(()) => HandlerOutcome::Ack,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("workshop queue full, retrying download command");
                    HandlerOutcome::Retry
                }
                Err(mpsc::error::TrySendError::Closed(_)) => HandlerOutcome::Retry,
            },
            command => {
                // Session commands always carry a session id.
                let Some(session_id) = command.session_id() else {
                    return HandlerOutcome::Ack;
                };
                self.dispatch_session(session_id, command).await
            }
        }
    }
}

/// One worker per session: drains the queue under the session's command
/// lock so handling is serialized even if something else ever grabs it.
fn spawn_session_worker<C: Clock + 'static>(
    manager: Arc<SessionManager<C>>,
    session_id: SessionId,
    mut rx: mpsc::Receiver<HostCommand>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let command = tokio::select! {
                command = rx.recv() => command,
                _ = cancel.cancelled() => {
                    debug!(%session_id, "session worker cancelled");
                    return;
                }
            };
            let Some(command) = command else {
                return;
            };

            let lock = manager.table.command_lock(session_id);
            let _guard = lock.lock().await;

            match command {
                HostCommand::StartSession(start) => manager.start_session(start).await,
                HostCommand::StopSession(stop) => manager.stop_session(stop).await,
                HostCommand::KillSession(kill) => manager.kill_session(kill.session_id).await,
                HostCommand::SendInput(input) => {
                    let bytes = match input.decode_input() {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!(%session_id, error = %e, "dropping undecodable input");
                            continue;
                        }
                    };
                    if let Err(e) = manager.send_input(session_id, &bytes).await {
                        warn!(%session_id, error = %e, "send_input failed");
                    }
                }
                HostCommand::DownloadAddon(_) => {}
            }
        }
    });
}
