// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-side counters, surfaced through periodic logs.

use std::sync::atomic::AtomicU64;

#[derive(Debug, Default)]
pub struct HostMetrics {
    /// Log lines dropped because the bus-forwarding queue was full.
    pub dropped_bus_lines: AtomicU64,
    /// Commands that failed to decode (acked and ignored).
    pub malformed_commands: AtomicU64,
    /// Containers removed by the orphan sweep.
    pub orphans_removed: AtomicU64,
    /// Sessions that ended in `crashed`.
    pub crashed_sessions: AtomicU64,
}
