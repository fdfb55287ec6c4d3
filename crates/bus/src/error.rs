// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for bus operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("bus connection is closed")]
    Closed,

    #[error("invalid bus url: {0}")]
    InvalidUrl(String),

    #[error("publish to {exchange}/{routing_key} was not confirmed")]
    Unconfirmed {
        exchange: String,
        routing_key: String,
    },

    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
