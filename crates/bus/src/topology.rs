// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exchange and queue topology.
//!
//! Declarations are idempotent on the broker, so both daemons declare
//! everything they touch at startup and again after every reconnect.

use crate::error::BusError;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};
use manman_core::{RoutingKey, ServerId, SessionId};

/// Topic exchange carrying commands, status and logs between the planes.
pub const EXCHANGE_MANMAN: &str = "manman";

/// Topic exchange for out-of-band subscribers (Slack, metrics, audit).
pub const EXCHANGE_EXTERNAL: &str = "external";

/// Tuning for the ephemeral per-session log queues.
#[derive(Debug, Clone, Copy)]
pub struct LogQueueConfig {
    pub ttl_ms: u32,
    pub max_messages: u32,
}

impl Default for LogQueueConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 180_000,
            max_messages: 500,
        }
    }
}

impl LogQueueConfig {
    /// Queue arguments: TTL, bounded length, drop-head overflow so an
    /// absent consumer can never backpressure the host.
    pub fn to_args(self) -> FieldTable {
        let mut args = FieldTable::default();
        args.insert("x-message-ttl".into(), AMQPValue::LongUInt(self.ttl_ms));
        args.insert("x-max-length".into(), AMQPValue::LongUInt(self.max_messages));
        args.insert(
            "x-overflow".into(),
            AMQPValue::LongString("drop-head".into()),
        );
        args
    }
}

/// Declare both exchanges.
pub async fn declare_exchanges(channel: &Channel) -> Result<(), BusError> {
    for exchange in [EXCHANGE_MANMAN, EXCHANGE_EXTERNAL] {
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
    }
    Ok(())
}

/// Declare and bind the durable per-host command queue; returns its name.
pub async fn declare_host_command_queue(
    channel: &Channel,
    server_id: ServerId,
) -> Result<String, BusError> {
    let queue = RoutingKey::command_queue(server_id);
    channel
        .queue_declare(
            &queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            &queue,
            EXCHANGE_MANMAN,
            &RoutingKey::command_binding(server_id),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(queue)
}

/// Queue the event processor consumes status and health traffic from.
pub const PROCESSOR_QUEUE: &str = "manman-event-processor";

/// Declare and bind the event processor's status queue.
pub async fn declare_processor_queue(channel: &Channel) -> Result<String, BusError> {
    channel
        .queue_declare(
            PROCESSOR_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    for binding in ["status.#", "health.#"] {
        channel
            .queue_bind(
                PROCESSOR_QUEUE,
                EXCHANGE_MANMAN,
                binding,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
    }
    Ok(PROCESSOR_QUEUE.to_string())
}

/// Declare the ephemeral log queue for one session.
///
/// Non-durable and auto-delete: the queue exists so a streaming bridge
/// can attach on demand; nothing is lost when nobody listens because the
/// archiver owns durability.
pub async fn declare_session_log_queue(
    channel: &Channel,
    session_id: SessionId,
    config: LogQueueConfig,
) -> Result<String, BusError> {
    let queue = RoutingKey::session_log_queue(session_id);
    channel
        .queue_declare(
            &queue,
            QueueDeclareOptions {
                durable: false,
                auto_delete: true,
                ..QueueDeclareOptions::default()
            },
            config.to_args(),
        )
        .await?;
    channel
        .queue_bind(
            &queue,
            EXCHANGE_MANMAN,
            &RoutingKey::session_logs(session_id),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(queue)
}

/// Seam for declaring per-session log queues, so the host's session
/// lifecycle can be exercised without a broker.
#[async_trait::async_trait]
pub trait LogQueueProvisioner: Send + Sync {
    async fn provision_session_log_queue(
        &self,
        session_id: SessionId,
        config: LogQueueConfig,
    ) -> Result<(), BusError>;
}

/// lapin-backed provisioner over the shared connection.
pub struct BusProvisioner {
    bus: std::sync::Arc<crate::connection::Bus>,
}

impl BusProvisioner {
    pub fn new(bus: std::sync::Arc<crate::connection::Bus>) -> Self {
        Self { bus }
    }
}

#[async_trait::async_trait]
impl LogQueueProvisioner for BusProvisioner {
    async fn provision_session_log_queue(
        &self,
        session_id: SessionId,
        config: LogQueueConfig,
    ) -> Result<(), BusError> {
        let channel = self.bus.channel().await?;
        declare_session_log_queue(&channel, session_id, config).await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeLogQueueProvisioner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Records which sessions had a log queue declared; never fails.
    #[derive(Default)]
    pub struct FakeLogQueueProvisioner {
        declared: Mutex<Vec<SessionId>>,
    }

    impl FakeLogQueueProvisioner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn declared(&self) -> Vec<SessionId> {
            self.declared.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl LogQueueProvisioner for FakeLogQueueProvisioner {
        async fn provision_session_log_queue(
            &self,
            session_id: SessionId,
            _config: LogQueueConfig,
        ) -> Result<(), BusError> {
            self.declared.lock().push(session_id);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
