// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup wiring and ordered shutdown.
//!
//! Startup order follows the dependency chain: Docker, bus, database and
//! object store first (all fatal on failure), then the shared state, then
//! the announcement + reconciliation, then the long-running tasks.
//! Shutdown announces `offline`, cancels the shared token, drains the
//! consumer, flushes the archiver, and closes the bus.

use crate::attach::spawn_log_forwarder;
use crate::config::{ConfigError, HostConfig};
use crate::consumer::CommandRouter;
use crate::heartbeat::spawn_heartbeat;
use crate::metrics::HostMetrics;
use crate::publisher::HostPublisher;
use crate::reconcile::reconcile;
use crate::session::{SessionManager, SessionTable};
use crate::sweep::spawn_sweeper;
use crate::workshop::WorkshopOrchestrator;
use manman_archiver::{ArchiverConfig, LogArchiver};
use manman_bus::{
    declare_exchanges, declare_host_command_queue, Bus, BusError, BusProvisioner, BusPublisher,
    ConsumerConfig, LogQueueConfig, LogQueueProvisioner,
};
use manman_core::{HostStatus, SessionId, SystemClock};
use manman_docker::{ContainerRuntime, DockerClient, DockerError};
use manman_storage::{PgStore, S3ObjectStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const LOG_FORWARD_QUEUE: usize = 1024;
const WORKSHOP_QUEUE: usize = 64;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Docker(#[from] DockerError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("bad command: {0}")]
    BadCommand(String),

    #[error("session {0} is not running")]
    SessionNotRunning(SessionId),
}

/// A running host manager.
pub struct HostDaemon {
    bus: Arc<Bus>,
    publisher: Arc<HostPublisher>,
    archiver: Arc<LogArchiver>,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    forwarder: JoinHandle<()>,
}

impl HostDaemon {
    /// Bring the host online. Infrastructure failures here are fatal;
    /// the process should exit non-zero.
    pub async fn start(config: HostConfig) -> Result<Self, HostError> {
        let config = Arc::new(config);
        let clock = SystemClock;

        let docker: Arc<dyn ContainerRuntime> = Arc::new(
            DockerClient::connect(config.docker_host.as_deref(), config.docker_deadline).await?,
        );
        let bus = Bus::connect(&config.rabbitmq_url).await?;
        let pg = PgStore::connect(&config.database_url).await?;
        let object_store = S3ObjectStore::new(config.s3.clone()).await;

        let channel = bus.channel().await?;
        declare_exchanges(&channel).await?;
        let queue = declare_host_command_queue(&channel, config.server_id).await?;
        info!(queue, server_id = %config.server_id, "declared host topology");
        let log_queue_config = LogQueueConfig {
            ttl_ms: config.log_buffer_ttl_ms,
            max_messages: config.log_buffer_max_messages,
        };

        let publisher = Arc::new(HostPublisher::new(
            Arc::new(BusPublisher::new(Arc::clone(&bus))),
            config.server_id,
        ));
        let metrics = Arc::new(HostMetrics::default());
        let table = Arc::new(SessionTable::new());

        let archiver = Arc::new(LogArchiver::spawn(
            Arc::new(object_store),
            Arc::new(pg),
            clock.clone(),
            ArchiverConfig::default(),
        ));

        let (log_tx, log_rx) = tokio::sync::mpsc::channel(LOG_FORWARD_QUEUE);
        let forwarder = spawn_log_forwarder(Arc::clone(&publisher), log_rx);

        let provisioner: Arc<dyn LogQueueProvisioner> =
            Arc::new(BusProvisioner::new(Arc::clone(&bus)));
        let manager = Arc::new(SessionManager::new(
            Arc::clone(&docker),
            Arc::clone(&publisher),
            Arc::clone(&archiver),
            Arc::clone(&table),
            Arc::clone(&config),
            clock.clone(),
            Arc::clone(&metrics),
            log_tx,
            provisioner,
            log_queue_config,
        ));

        publisher.host_status(HostStatus::Online).await?;
        reconcile(&docker, &manager, config.server_id).await;

        let cancel = CancellationToken::new();
        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        let (workshop_tx, workshop_rx) = tokio::sync::mpsc::channel(WORKSHOP_QUEUE);
        let workshop = WorkshopOrchestrator::new(
            Arc::clone(&docker),
            Arc::clone(&publisher),
            Arc::clone(&config),
            clock.clone(),
        );
        tasks.push(("workshop", workshop.spawn_run(workshop_rx, cancel.clone())));

        let router = Arc::new(CommandRouter::new(
            Arc::clone(&manager),
            workshop_tx,
            Arc::clone(&metrics),
            cancel.clone(),
        ));
        let consumer = tokio::spawn(manman_bus::run_consumer(
            Arc::clone(&bus),
            queue,
            format!("hostd-{}", config.server_id),
            router,
            ConsumerConfig::default(),
            cancel.clone(),
        ));
        tasks.push(("consumer", consumer));

        tasks.push((
            "heartbeat",
            spawn_heartbeat(
                Arc::clone(&publisher),
                Arc::clone(&table),
                config.heartbeat_interval,
                cancel.clone(),
            ),
        ));
        tasks.push((
            "sweeper",
            spawn_sweeper(
                docker,
                table,
                config.server_id,
                clock,
                config.sweep_interval,
                config.sweep_grace,
                metrics,
                cancel.clone(),
            ),
        ));

        info!(server_id = %config.server_id, "host manager online");
        Ok(Self {
            bus,
            publisher,
            archiver,
            cancel,
            tasks,
            forwarder,
        })
    }

    /// Graceful shutdown.
    pub async fn close(self) {
        info!("host manager shutting down");
        if let Err(e) = self.publisher.host_status(HostStatus::Offline).await {
            warn!(error = %e, "could not announce offline");
        }

        self.cancel.cancel();
        for (name, task) in self.tasks {
            if task.await.is_err() {
                warn!(task = name, "task panicked during shutdown");
            }
        }

        self.archiver.close().await;
        self.forwarder.abort();
        self.bus.close().await;
        info!("host manager shutdown complete");
    }
}
