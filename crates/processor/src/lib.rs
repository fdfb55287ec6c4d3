// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ManMan event processor.
//!
//! `procd` consumes `status.#` and `health.#` from the bus, projects
//! them onto the relational store with state-machine validation, detects
//! stale hosts, and re-publishes the events out-of-band subscribers care
//! about on the external exchange.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod lifecycle;
pub mod projector;
pub mod stale;

pub use config::ProcessorConfig;
pub use lifecycle::{ProcessorDaemon, ProcessorError};
pub use projector::{Projector, ProjectorMetrics};
