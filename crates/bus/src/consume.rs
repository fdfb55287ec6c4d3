// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer loop and retry policy.
//!
//! Handlers classify each delivery as [`HandlerOutcome::Ack`] (done, or
//! permanently broken and logged) or [`HandlerOutcome::Retry`]
//! (transient). Retries are nacked back onto the queue until the
//! per-message cap is hit, after which the message is acked away and
//! logged as dead-lettered. The cap is tracked in-process keyed by
//! message content; a daemon restart resets it, which is acceptable for a
//! safety valve.

use crate::connection::Bus;
use crate::error::BusError;
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions};
use lapin::types::FieldTable;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// What to do with a delivery after handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Done (successfully, or permanently unprocessable and logged).
    Ack,
    /// Transient failure; requeue subject to the retry cap.
    Retry,
}

/// A bus message handler.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, routing_key: &str, payload: &[u8]) -> HandlerOutcome;
}

#[derive(Debug, Clone, Copy)]
pub struct ConsumerConfig {
    pub max_retries: u32,
    /// How long in-flight handling may run after cancellation.
    pub drain_deadline: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            drain_deadline: Duration::from_secs(15),
        }
    }
}

/// In-process retry counter keyed by message content.
#[derive(Default)]
pub struct RetryTracker {
    counts: Mutex<HashMap<u64, u32>>,
}

impl RetryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(routing_key: &str, payload: &[u8]) -> u64 {
        let mut hasher = DefaultHasher::new();
        routing_key.hash(&mut hasher);
        payload.hash(&mut hasher);
        hasher.finish()
    }

    /// Record one more failure; returns true while retrying is allowed.
    pub fn should_retry(&self, routing_key: &str, payload: &[u8], max_retries: u32) -> bool {
        let key = Self::key(routing_key, payload);
        let mut counts = self.counts.lock();
        let count = counts.entry(key).or_insert(0);
        *count += 1;
        if *count > max_retries {
            counts.remove(&key);
            false
        } else {
            true
        }
    }

    /// Clear the counter after a successful handling.
    pub fn reset(&self, routing_key: &str, payload: &[u8]) {
        self.counts
            .lock()
            .remove(&Self::key(routing_key, payload));
    }
}

/// Consume a queue until cancelled.
///
/// The loop re-enters `Bus::channel` (which reconnects with backoff)
/// whenever the delivery stream ends; the broker redelivers unacked
/// messages on the new consumer. Each delivery is handled inline so a
/// queue's deliveries reach the handler in broker order.
pub async fn run_consumer(
    bus: Arc<Bus>,
    queue: String,
    consumer_tag: String,
    handler: Arc<dyn MessageHandler>,
    config: ConsumerConfig,
    cancel: CancellationToken,
) {
    let retries = RetryTracker::new();

    'reconnect: while !cancel.is_cancelled() {
        let channel = tokio::select! {
            channel = bus.channel() => match channel {
                Ok(channel) => channel,
                Err(e) => {
                    error!(error = %e, "consumer could not open channel");
                    return;
                }
            },
            _ = cancel.cancelled() => return,
        };

        let mut consumer = match channel
            .basic_consume(
                &queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => {
                warn!(queue, error = %e, "basic_consume failed, reconnecting");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue 'reconnect;
            }
        };

        info!(queue, "consuming");

        loop {
            let delivery = tokio::select! {
                delivery = consumer.next() => delivery,
                _ = cancel.cancelled() => {
                    info!(queue, "consumer cancelled, draining");
                    return;
                }
            };

            let delivery = match delivery {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => {
                    warn!(queue, error = %e, "delivery stream error, reconnecting");
                    continue 'reconnect;
                }
                None => {
                    warn!(queue, "delivery stream ended, reconnecting");
                    continue 'reconnect;
                }
            };

            let routing_key = delivery.routing_key.as_str().to_string();

            // Handlers run unbounded in normal operation; only once
            // cancellation fires does the drain deadline cap the
            // in-flight one.
            let mut handling = handler.handle(&routing_key, &delivery.data);
            let outcome = tokio::select! {
                outcome = &mut handling => outcome,
                _ = cancel.cancelled() => {
                    match tokio::time::timeout(config.drain_deadline, &mut handling).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(routing_key, "handler exceeded drain deadline, will retry");
                            HandlerOutcome::Retry
                        }
                    }
                }
            };

            let ack_result: Result<(), BusError> = match outcome {
                HandlerOutcome::Ack => {
                    retries.reset(&routing_key, &delivery.data);
                    delivery.ack(BasicAckOptions::default()).await.map_err(Into::into)
                }
                HandlerOutcome::Retry => {
                    if retries.should_retry(&routing_key, &delivery.data, config.max_retries) {
                        delivery
                            .nack(BasicNackOptions {
                                requeue: true,
                                ..BasicNackOptions::default()
                            })
                            .await
                            .map_err(Into::into)
                    } else {
                        error!(routing_key, "retry cap exceeded, dead-lettering message");
                        delivery.ack(BasicAckOptions::default()).await.map_err(Into::into)
                    }
                }
            };

            if let Err(e) = ack_result {
                warn!(routing_key, error = %e, "ack/nack failed, reconnecting");
                continue 'reconnect;
            }
        }
    }
}

#[cfg(test)]
#[path = "consume_tests.rs"]
mod tests;
