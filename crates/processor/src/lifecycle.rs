// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processor lifecycle: startup wiring and ordered shutdown.

use crate::config::ProcessorConfig;
use crate::projector::Projector;
use crate::stale::spawn_stale_detector;
use manman_bus::{
    declare_exchanges, declare_processor_queue, Bus, BusError, BusPublisher, ConsumerConfig,
    Publisher,
};
use manman_core::SystemClock;
use manman_storage::{PgStore, ProjectionStore, StorageError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("missing required environment variable {0}")]
    MissingConfig(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidConfig { name: &'static str, value: String },

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A running event processor.
pub struct ProcessorDaemon {
    bus: Arc<Bus>,
    cancel: CancellationToken,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl ProcessorDaemon {
    pub async fn start(config: ProcessorConfig) -> Result<Self, ProcessorError> {
        let clock = SystemClock;

        let bus = Bus::connect(&config.rabbitmq_url).await?;
        let store: Arc<dyn ProjectionStore> =
            Arc::new(PgStore::connect(&config.database_url).await?);

        let channel = bus.channel().await?;
        declare_exchanges(&channel).await?;
        let queue = declare_processor_queue(&channel).await?;
        info!(queue, "declared processor topology");

        let publisher: Arc<dyn Publisher> = Arc::new(BusPublisher::new(Arc::clone(&bus)));
        let projector = Arc::new(Projector::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
            clock.clone(),
        ));

        let cancel = CancellationToken::new();
        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        tasks.push((
            "consumer",
            tokio::spawn(manman_bus::run_consumer(
                Arc::clone(&bus),
                queue,
                "procd".to_string(),
                Arc::clone(&projector) as Arc<dyn manman_bus::MessageHandler>,
                ConsumerConfig::default(),
                cancel.clone(),
            )),
        ));

        tasks.push((
            "stale-detector",
            spawn_stale_detector(
                store,
                projector,
                Arc::clone(&publisher),
                publisher,
                clock,
                config.stale_check_interval,
                config.stale_threshold,
                cancel.clone(),
            ),
        ));

        info!("event processor online");
        Ok(Self { bus, cancel, tasks })
    }

    pub async fn close(self) {
        info!("event processor shutting down");
        self.cancel.cancel();
        for (name, task) in self.tasks {
            if task.await.is_err() {
                warn!(task = name, "task panicked during shutdown");
            }
        }
        self.bus.close().await;
        info!("event processor shutdown complete");
    }
}
