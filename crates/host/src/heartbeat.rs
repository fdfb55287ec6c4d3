// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic host heartbeat.
//!
//! Absence of these messages is what lets the event processor declare
//! the host stale, so the task is tiny and never waits on anything but
//! the publish itself.

use crate::publisher::HostPublisher;
use crate::session::SessionTable;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub fn spawn_heartbeat(
    publisher: Arc<HostPublisher>,
    table: Arc<SessionTable>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            if let Err(e) = publisher.health(table.stats()).await {
                warn!(error = %e, "heartbeat publish failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
