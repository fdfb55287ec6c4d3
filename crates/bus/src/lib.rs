// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RabbitMQ plumbing for ManMan.
//!
//! One persistent connection per process with a reconnect loop, the
//! exchange/queue topology both planes agree on, a publisher trait the
//! daemons depend on (with a recording fake for tests), and a consumer
//! loop implementing the ack/retry/dead-letter policy.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod connection;
mod consume;
mod error;
mod publish;
mod topology;

pub use connection::Bus;
pub use consume::{run_consumer, ConsumerConfig, HandlerOutcome, MessageHandler, RetryTracker};
pub use error::BusError;
pub use publish::{publish_json, BusPublisher, Publisher};
pub use topology::{
    declare_exchanges, declare_host_command_queue, declare_processor_queue,
    declare_session_log_queue, BusProvisioner, LogQueueConfig, LogQueueProvisioner,
    EXCHANGE_EXTERNAL, EXCHANGE_MANMAN, PROCESSOR_QUEUE,
};

#[cfg(any(test, feature = "test-support"))]
pub use publish::{FakePublisher, PublishedMessage};
#[cfg(any(test, feature = "test-support"))]
pub use topology::FakeLogQueueProvisioner;
