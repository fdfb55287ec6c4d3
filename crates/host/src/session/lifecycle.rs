// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle operations.
//!
//! All operations assume the caller holds the session's command lock
//! (the router acquires it), so per-session handling is serialized and a
//! stop arriving between create and attach is handled deterministically.
//!
//! Status reporting rules:
//! - any Docker failure during start makes the session `crashed`
//! - a container that exits on its own with code 0 is reported
//!   `stopping` then `stopped` (the processor's table has no
//!   running -> stopped edge)
//! - attach EOF without a requested stop is a crash; the exit code is
//!   read via inspect

use crate::attach::ForwardedLine;
use crate::config::HostConfig;
use crate::lifecycle::HostError;
use crate::metrics::HostMetrics;
use crate::publisher::HostPublisher;
use manman_archiver::{LogArchiver, LogLine};
use manman_bus::{LogQueueConfig, LogQueueProvisioner};
use manman_core::{
    resolve_parameters, Clock, ContainerLabels, LogSource, SessionId, SessionStatus,
    StartSessionCommand, StopSessionCommand, SgcId,
};
use manman_docker::{session_network_name, ContainerRuntime, ContainerSpec, StdinWriter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::table::{SessionEntry, SessionTable};

pub struct SessionManager<C: Clock> {
    pub(crate) docker: Arc<dyn ContainerRuntime>,
    pub(crate) publisher: Arc<HostPublisher>,
    pub(crate) archiver: Arc<LogArchiver>,
    pub(crate) table: Arc<SessionTable>,
    pub(crate) config: Arc<HostConfig>,
    pub(crate) clock: C,
    pub(crate) metrics: Arc<HostMetrics>,
    pub(crate) log_tx: mpsc::Sender<ForwardedLine>,
    provisioner: Arc<dyn LogQueueProvisioner>,
    log_queue: LogQueueConfig,
    stdin: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<StdinWriter>>>>,
}

impl<C: Clock + 'static> SessionManager<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        docker: Arc<dyn ContainerRuntime>,
        publisher: Arc<HostPublisher>,
        archiver: Arc<LogArchiver>,
        table: Arc<SessionTable>,
        config: Arc<HostConfig>,
        clock: C,
        metrics: Arc<HostMetrics>,
        log_tx: mpsc::Sender<ForwardedLine>,
        provisioner: Arc<dyn LogQueueProvisioner>,
        log_queue: LogQueueConfig,
    ) -> Self {
        Self {
            docker,
            publisher,
            archiver,
            table,
            config,
            clock,
            metrics,
            log_tx,
            provisioner,
            log_queue,
            stdin: Mutex::new(HashMap::new()),
        }
    }

    /// Declare the ephemeral log queue for a session so a streaming
    /// bridge can attach late and still see recent lines. Best effort:
    /// the log path works (lossily) without it.
    async fn provision_log_queue(&self, session_id: SessionId) {
        if let Err(e) = self
            .provisioner
            .provision_session_log_queue(session_id, self.log_queue)
            .await
        {
            warn!(%session_id, error = %e, "log queue declaration failed");
        }
    }

    fn container_name(&self, session_id: SessionId) -> String {
        format!(
            "manman-{}-session-{session_id}",
            self.config.environment.as_str()
        )
    }

    /// Idempotently start a session.
    ///
    /// A live entry for the same session id makes this a no-op unless
    /// `force` is set, in which case the old container is stopped and
    /// removed first. A different live session bound to the same SGC is
    /// a conflict: forced starts evict it, unforced ones report the new
    /// session as crashed.
    pub async fn start_session(self: &Arc<Self>, cmd: StartSessionCommand) {
        if let Some(existing) = self.table.get(cmd.session_id) {
            if !existing.status.is_terminal() {
                if cmd.force {
                    info!(session_id = %cmd.session_id, "force start, stopping existing container");
                    self.stop_internal(existing, true).await;
                } else {
                    info!(session_id = %cmd.session_id, "session already tracked, ignoring start");
                    return;
                }
            }
        }

        if let Some(bound) = self.table.by_sgc(cmd.sgc_id) {
            if bound.session_id != cmd.session_id && !bound.status.is_terminal() {
                if cmd.force {
                    info!(
                        sgc_id = %cmd.sgc_id,
                        evicted = %bound.session_id,
                        "force start, evicting session bound to sgc"
                    );
                    self.stop_internal(bound, true).await;
                } else {
                    warn!(
                        session_id = %cmd.session_id,
                        sgc_id = %cmd.sgc_id,
                        bound = %bound.session_id,
                        "sgc already has a live session, reporting crash"
                    );
                    let _ = self
                        .publisher
                        .session_status(cmd.session_id, cmd.sgc_id, SessionStatus::Crashed, None)
                        .await;
                    return;
                }
            }
        }

        self.table.insert(SessionEntry {
            session_id: cmd.session_id,
            sgc_id: cmd.sgc_id,
            container_id: None,
            network: None,
            status: SessionStatus::Starting,
            stop_requested: false,
        });
        let _ = self
            .publisher
            .session_status(cmd.session_id, cmd.sgc_id, SessionStatus::Starting, None)
            .await;
        self.provision_log_queue(cmd.session_id).await;

        match self.launch(&cmd).await {
            Ok(()) => {
                self.table.set_status(cmd.session_id, SessionStatus::Running);
                let _ = self
                    .publisher
                    .session_status(cmd.session_id, cmd.sgc_id, SessionStatus::Running, None)
                    .await;
                self.system_log(cmd.session_id, cmd.sgc_id, "session started");
            }
            Err(e) => {
                warn!(session_id = %cmd.session_id, error = %e, "session start failed");
                self.system_log(
                    cmd.session_id,
                    cmd.sgc_id,
                    &format!("session start failed: {e}"),
                );
                self.cleanup_failed_start(cmd.session_id).await;
                self.metrics.crashed_sessions.fetch_add(1, Ordering::Relaxed);
                let _ = self
                    .publisher
                    .session_status(cmd.session_id, cmd.sgc_id, SessionStatus::Crashed, None)
                    .await;
            }
        }
    }

    /// Pull, create, start, attach. Any error bubbles to the caller,
    /// which reports the crash.
    async fn launch(self: &Arc<Self>, cmd: &StartSessionCommand) -> Result<(), HostError> {
        let session_id = cmd.session_id;
        let sgc_id = cmd.sgc_id;
        let created_at = (self.clock.epoch_ms() / 1000) as i64;

        self.docker.pull_image(&cmd.game_config.image).await?;

        let network_labels = ContainerLabels::network(
            self.config.server_id,
            self.config.environment.clone(),
            session_id,
            created_at,
        );
        let network = self
            .docker
            .create_session_network(&network_labels, session_id)
            .await?;
        self.table.set_network(session_id, network.clone());

        let params = resolve_parameters(
            &[],
            &cmd.server_game_config.parameters,
            &HashMap::new(),
        )
        .map_err(|e| HostError::BadCommand(e.to_string()))?;
        let rendered_args = cmd
            .game_config
            .rendered_args(&params)
            .map_err(|e| HostError::BadCommand(e.to_string()))?;
        let env = cmd
            .game_config
            .rendered_env(&params)
            .map_err(|e| HostError::BadCommand(e.to_string()))?;

        let mut command = cmd.game_config.command.clone().unwrap_or_default();
        command.extend(rendered_args);

        let mounts = cmd
            .server_game_config
            .volume_mounts
            .iter()
            .map(|mount| {
                let mut mount = mount.clone();
                if mount.is_bind() {
                    mount.source = self.config.host_path(&mount.source);
                }
                mount
            })
            .collect();

        let spec = ContainerSpec {
            name: self.container_name(session_id),
            image: cmd.game_config.image.clone(),
            entrypoint: cmd.game_config.entrypoint.clone(),
            cmd: (!command.is_empty()).then_some(command),
            env,
            labels: ContainerLabels::game(
                self.config.server_id,
                self.config.environment.clone(),
                session_id,
                sgc_id,
                created_at,
            ),
            port_bindings: cmd.server_game_config.port_bindings.clone(),
            mounts,
            network: Some(network),
            interactive: true,
        };

        let container_id = self.docker.create_container(&spec).await?;
        self.table.set_container(session_id, container_id.clone());
        self.docker.start_container(&container_id).await?;

        let handle = self.docker.attach(&container_id).await?;
        let (frames, stdin) = handle.split();
        self.stdin
            .lock()
            .insert(session_id, Arc::new(tokio::sync::Mutex::new(stdin)));
        Arc::clone(self).spawn_attach_reader(session_id, sgc_id, container_id, frames);
        Ok(())
    }

    /// Best-effort teardown after a failed start.
    async fn cleanup_failed_start(&self, session_id: SessionId) {
        let entry = self.table.remove(session_id);
        self.stdin.lock().remove(&session_id);
        if let Some(entry) = entry {
            if let Some(container_id) = entry.container_id {
                let _ = self.docker.remove_container(&container_id, true).await;
            }
            if let Some(network) = entry.network {
                let _ = self.docker.remove_network(&network).await;
            }
        } else {
            let _ = self
                .docker
                .remove_network(&session_network_name(session_id))
                .await;
        }
    }

    /// Graceful (or forced) stop. Idempotent when the session is unknown
    /// or its container is already gone.
    pub async fn stop_session(&self, cmd: StopSessionCommand) {
        let Some(entry) = self.table.get(cmd.session_id) else {
            info!(session_id = %cmd.session_id, "stop for untracked session, nothing to do");
            return;
        };
        if entry.status.is_terminal() {
            return;
        }
        self.stop_internal(entry, cmd.force).await;
    }

    /// Immediate removal. Equivalent to a forced stop.
    pub async fn kill_session(&self, session_id: SessionId) {
        let Some(entry) = self.table.get(session_id) else {
            info!(%session_id, "kill for untracked session, nothing to do");
            return;
        };
        if entry.status.is_terminal() {
            return;
        }
        self.stop_internal(entry, true).await;
    }

    async fn stop_internal(&self, entry: SessionEntry, force: bool) {
        let session_id = entry.session_id;
        let sgc_id = entry.sgc_id;

        self.table.mark_stop_requested(session_id);
        self.table.set_status(session_id, SessionStatus::Stopping);
        let _ = self
            .publisher
            .session_status(session_id, sgc_id, SessionStatus::Stopping, None)
            .await;

        let mut exit_code = None;
        if let Some(container_id) = &entry.container_id {
            if force {
                let _ = self.docker.remove_container(container_id, true).await;
            } else {
                let stop_timeout = self.config.stop_timeout.as_secs() as i64;
                if let Err(e) = self.docker.stop_container(container_id, stop_timeout).await {
                    warn!(%session_id, error = %e, "graceful stop failed, removing");
                }
                exit_code = self.docker.exit_code(container_id).await.ok().flatten();
                let _ = self.docker.remove_container(container_id, true).await;
            }
        }

        let status = match exit_code {
            Some(code) if code != 0 => SessionStatus::Crashed,
            _ => SessionStatus::Stopped,
        };
        self.finalize_session(session_id, sgc_id, status, exit_code)
            .await;
    }

    /// Write bytes to a running session's stdin.
    pub async fn send_input(&self, session_id: SessionId, input: &[u8]) -> Result<(), HostError> {
        let entry = self
            .table
            .get(session_id)
            .ok_or(HostError::SessionNotRunning(session_id))?;
        if entry.status != SessionStatus::Running {
            return Err(HostError::SessionNotRunning(session_id));
        }
        let stdin = self
            .stdin
            .lock()
            .get(&session_id)
            .cloned()
            .ok_or(HostError::SessionNotRunning(session_id))?;
        stdin.lock().await.write_all(input).await?;
        Ok(())
    }

    /// Rebuild a session entry from a running labeled container found at
    /// startup, re-attach, and re-announce `running`.
    pub async fn adopt_session(
        self: &Arc<Self>,
        session_id: SessionId,
        sgc_id: SgcId,
        container_id: &str,
    ) {
        self.table.insert(SessionEntry {
            session_id,
            sgc_id,
            container_id: Some(container_id.to_string()),
            network: Some(session_network_name(session_id)),
            status: SessionStatus::Running,
            stop_requested: false,
        });

        self.provision_log_queue(session_id).await;
        match self.docker.attach(container_id).await {
            Ok(handle) => {
                let (frames, stdin) = handle.split();
                self.stdin
                    .lock()
                    .insert(session_id, Arc::new(tokio::sync::Mutex::new(stdin)));
                Arc::clone(self).spawn_attach_reader(
                    session_id,
                    sgc_id,
                    container_id.to_string(),
                    frames,
                );
                info!(%session_id, "re-attached to running session");
                let _ = self
                    .publisher
                    .session_status(session_id, sgc_id, SessionStatus::Running, None)
                    .await;
                self.system_log(session_id, sgc_id, "host manager re-attached");
            }
            Err(e) => {
                warn!(%session_id, error = %e, "re-attach failed, treating as crashed");
                let exit_code = self.docker.exit_code(container_id).await.ok().flatten();
                let _ = self.docker.remove_container(container_id, true).await;
                self.metrics.crashed_sessions.fetch_add(1, Ordering::Relaxed);
                self.finalize_session(session_id, sgc_id, SessionStatus::Crashed, exit_code)
                    .await;
            }
        }
    }

    /// Called by the attach reader when the stream ends without a stop
    /// having been requested.
    pub(crate) async fn handle_attach_eof(
        &self,
        session_id: SessionId,
        sgc_id: SgcId,
        container_id: &str,
    ) {
        let Some(entry) = self.table.get(session_id) else {
            return;
        };
        if entry.container_id.as_deref() != Some(container_id) {
            // Stale reader: the session was force-restarted onto a new
            // container and this EOF belongs to the evicted one.
            return;
        }
        if entry.stop_requested || entry.status.is_terminal() {
            // The stop path owns finalization.
            return;
        }

        let exit_code = self.poll_exit_code(container_id).await;
        let _ = self.docker.remove_container(container_id, true).await;

        self.report_self_exit(session_id, sgc_id, exit_code).await;
    }

    /// Report a session whose container ended without a stop command.
    ///
    /// A clean exit reports the stopping -> stopped chain so downstream
    /// projection stays inside the transition table; anything else is a
    /// crash carrying whatever exit code inspect produced.
    pub(crate) async fn report_self_exit(
        &self,
        session_id: SessionId,
        sgc_id: SgcId,
        exit_code: Option<i64>,
    ) {
        match exit_code {
            Some(0) => {
                info!(%session_id, "container exited cleanly");
                let _ = self
                    .publisher
                    .session_status(session_id, sgc_id, SessionStatus::Stopping, None)
                    .await;
                self.finalize_session(session_id, sgc_id, SessionStatus::Stopped, Some(0))
                    .await;
            }
            code => {
                warn!(%session_id, ?code, "container ended without stop, session crashed");
                self.metrics.crashed_sessions.fetch_add(1, Ordering::Relaxed);
                self.finalize_session(session_id, sgc_id, SessionStatus::Crashed, code)
                    .await;
            }
        }
    }

    /// The container may take a beat to finish dying after its stream
    /// closes; poll inspect briefly for the code.
    async fn poll_exit_code(&self, container_id: &str) -> Option<i64> {
        for _ in 0..10 {
            match self.docker.exit_code(container_id).await {
                Ok(Some(code)) => return Some(code),
                Ok(None) => tokio::time::sleep(Duration::from_millis(500)).await,
                Err(_) => return None,
            }
        }
        None
    }

    /// Terminal bookkeeping: drop handles, remove the network, remove
    /// the table entry, publish the final status.
    pub(crate) async fn finalize_session(
        &self,
        session_id: SessionId,
        sgc_id: SgcId,
        status: SessionStatus,
        exit_code: Option<i64>,
    ) {
        self.stdin.lock().remove(&session_id);
        if let Some(entry) = self.table.remove(session_id) {
            if let Some(network) = entry.network {
                let _ = self.docker.remove_network(&network).await;
            }
        }
        let _ = self
            .publisher
            .session_status(session_id, sgc_id, status, exit_code)
            .await;
        self.system_log(
            session_id,
            sgc_id,
            &format!("session {status} (exit code {exit_code:?})"),
        );
    }

    /// Inject a host-side event into the session's archived log.
    pub(crate) fn system_log(&self, session_id: SessionId, sgc_id: SgcId, message: &str) {
        self.archiver.ingest(LogLine {
            sgc_id,
            session_id,
            timestamp: self.clock.utc_now(),
            source: LogSource::System,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
