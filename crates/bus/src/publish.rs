// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publishing.
//!
//! Daemons depend on the [`Publisher`] trait, not on lapin, so handler
//! logic is testable against the recording fake.

use crate::connection::Bus;
use crate::error::BusError;
use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::BasicProperties;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Something that can put bytes on an exchange.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish and wait for the broker to accept the message.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError>;

    /// Fire-and-forget variant for log lines: failures are logged and
    /// swallowed so the log path can never stall a session.
    async fn publish_lossy(&self, exchange: &str, routing_key: &str, payload: Vec<u8>) {
        if let Err(e) = self.publish(exchange, routing_key, payload).await {
            warn!(routing_key, error = %e, "lossy publish dropped");
        }
    }
}

/// Serialize a payload and publish it.
pub async fn publish_json<T: Serialize + Sync>(
    publisher: &dyn Publisher,
    exchange: &str,
    routing_key: &str,
    payload: &T,
) -> Result<(), BusError> {
    let bytes = serde_json::to_vec(payload)?;
    publisher.publish(exchange, routing_key, bytes).await
}

/// lapin-backed publisher; opens a channel per publish attempt via the
/// shared connection, which keeps reconnect handling in one place.
pub struct BusPublisher {
    bus: Arc<Bus>,
}

impl BusPublisher {
    pub fn new(bus: Arc<Bus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Publisher for BusPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BusError> {
        let channel = self.bus.channel().await?;
        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePublisher, PublishedMessage};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// One recorded publish.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PublishedMessage {
        pub exchange: String,
        pub routing_key: String,
        pub payload: Vec<u8>,
    }

    impl PublishedMessage {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
        }
    }

    /// Records everything published; never fails.
    #[derive(Default)]
    pub struct FakePublisher {
        messages: Mutex<Vec<PublishedMessage>>,
    }

    impl FakePublisher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn messages(&self) -> Vec<PublishedMessage> {
            self.messages.lock().clone()
        }

        /// Messages whose routing key matches exactly.
        pub fn with_key(&self, routing_key: &str) -> Vec<PublishedMessage> {
            self.messages
                .lock()
                .iter()
                .filter(|m| m.routing_key == routing_key)
                .cloned()
                .collect()
        }

        pub fn clear(&self) {
            self.messages.lock().clear();
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(
            &self,
            exchange: &str,
            routing_key: &str,
            payload: Vec<u8>,
        ) -> Result<(), BusError> {
            self.messages.lock().push(PublishedMessage {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                payload,
            });
            Ok(())
        }
    }
}
