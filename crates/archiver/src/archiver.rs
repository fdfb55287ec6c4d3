// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The archiver service: window map, sweeper, upload worker pool.
//!
//! `ingest` never blocks beyond two short mutexes, so the attach read
//! loop can call it inline. The sweeper moves windows whose minute has
//! aged past the closure delay onto a bounded channel; a fixed pool of
//! workers uploads them. `close` drains in order: stop the sweeper,
//! flush every open window through the channel, close the channel, join
//! the workers — nothing is intentionally dropped on a clean shutdown.

use crate::upload::{upload_window, UploadOutcome};
use crate::window::{LogLine, MinuteWindow, WindowKey};
use manman_core::Clock;
use manman_storage::{LogReferenceStore, ObjectStore, StorageError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ArchiverError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("compression error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct ArchiverConfig {
    /// A window uploads once its minute is at least this old.
    pub closure_delay: Duration,
    /// Sweeper period.
    pub check_interval: Duration,
    pub upload_workers: usize,
    /// Young-pending-row protection for concurrent replicas.
    pub protection_window: Duration,
    pub queue_capacity: usize,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            closure_delay: Duration::from_secs(120),
            check_interval: Duration::from_secs(30),
            upload_workers: 4,
            protection_window: Duration::from_secs(15),
            queue_capacity: 256,
        }
    }
}

/// Counters surfaced in logs; upload failures are best-effort losses.
#[derive(Debug, Default)]
pub struct ArchiverMetrics {
    pub uploaded_windows: AtomicU64,
    pub failed_uploads: AtomicU64,
    pub skipped_uploads: AtomicU64,
}

type WindowMap = Arc<Mutex<HashMap<WindowKey, Arc<Mutex<MinuteWindow>>>>>;

/// Per-minute log archiver. One per host process.
///
/// Shared behind an `Arc`; `close` therefore takes `&self` and is
/// idempotent (a second call finds nothing left to drain).
pub struct LogArchiver {
    windows: WindowMap,
    upload_tx: Mutex<Option<mpsc::Sender<MinuteWindow>>>,
    sweeper_cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    metrics: Arc<ArchiverMetrics>,
}

impl LogArchiver {
    pub fn spawn<C: Clock + 'static>(
        store: Arc<dyn ObjectStore>,
        log_refs: Arc<dyn LogReferenceStore>,
        clock: C,
        config: ArchiverConfig,
    ) -> Self {
        let windows: WindowMap = Arc::new(Mutex::new(HashMap::new()));
        let metrics = Arc::new(ArchiverMetrics::default());
        let (upload_tx, upload_rx) = mpsc::channel(config.queue_capacity);
        let upload_rx = Arc::new(tokio::sync::Mutex::new(upload_rx));

        let workers = (0..config.upload_workers.max(1))
            .map(|worker_id| {
                tokio::spawn(upload_worker(
                    worker_id,
                    Arc::clone(&upload_rx),
                    Arc::clone(&store),
                    Arc::clone(&log_refs),
                    clock.clone(),
                    config,
                    Arc::clone(&metrics),
                ))
            })
            .collect();

        let sweeper_cancel = CancellationToken::new();
        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&windows),
            clock.clone(),
            config,
            upload_tx.clone(),
            sweeper_cancel.clone(),
        ));

        Self {
            windows,
            upload_tx: Mutex::new(Some(upload_tx)),
            sweeper_cancel,
            sweeper: Mutex::new(Some(sweeper)),
            workers: Mutex::new(workers),
            metrics,
        }
    }

    /// Route one line into its minute window. Non-blocking.
    pub fn ingest(&self, line: LogLine) {
        let key = WindowKey::for_line(&line);
        let mut windows = self.windows.lock();
        match windows.get(&key) {
            Some(window) => window.lock().append(&line),
            None => {
                windows.insert(key, Arc::new(Mutex::new(MinuteWindow::new(&line))));
            }
        }
    }

    pub fn metrics(&self) -> Arc<ArchiverMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of windows still buffering.
    pub fn open_windows(&self) -> usize {
        self.windows.lock().len()
    }

    /// Flush everything and stop. Drain order: cancel sweeper, flush all
    /// open windows regardless of age, close the channel, join workers.
    pub async fn close(&self) {
        self.sweeper_cancel.cancel();
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            if sweeper.await.is_err() {
                warn!("archiver sweeper task panicked");
            }
        }

        let upload_tx = self.upload_tx.lock().take();
        let Some(upload_tx) = upload_tx else {
            return;
        };
        let remaining = drain_all(&self.windows);
        if !remaining.is_empty() {
            info!(windows = remaining.len(), "flushing open log windows");
        }
        for window in remaining {
            if upload_tx.send(window).await.is_err() {
                break;
            }
        }
        drop(upload_tx);

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.await.is_err() {
                warn!("archiver upload worker panicked");
            }
        }
        info!("log archiver closed");
    }
}

fn drain_all(windows: &WindowMap) -> Vec<MinuteWindow> {
    let drained: Vec<Arc<Mutex<MinuteWindow>>> =
        windows.lock().drain().map(|(_, window)| window).collect();
    drained
        .into_iter()
        .map(|window| match Arc::try_unwrap(window) {
            Ok(inner) => inner.into_inner(),
            Err(shared) => shared.lock().clone(),
        })
        .collect()
}

/// Remove windows whose minute is older than the closure delay.
fn take_eligible<C: Clock>(windows: &WindowMap, clock: &C, closure_delay: Duration) -> Vec<MinuteWindow> {
    let now = clock.utc_now();
    let cutoff = now
        - chrono::Duration::from_std(closure_delay).unwrap_or_else(|_| chrono::Duration::zero());

    let eligible: Vec<Arc<Mutex<MinuteWindow>>> = {
        let mut map = windows.lock();
        let keys: Vec<WindowKey> = map
            .keys()
            .filter(|key| key.minute_ts <= cutoff)
            .copied()
            .collect();
        keys.into_iter().filter_map(|key| map.remove(&key)).collect()
    };

    eligible
        .into_iter()
        .map(|window| match Arc::try_unwrap(window) {
            Ok(inner) => inner.into_inner(),
            Err(shared) => shared.lock().clone(),
        })
        .collect()
}

async fn run_sweeper<C: Clock>(
    windows: WindowMap,
    clock: C,
    config: ArchiverConfig,
    upload_tx: mpsc::Sender<MinuteWindow>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(config.check_interval) => {}
        }

        let eligible = take_eligible(&windows, &clock, config.closure_delay);
        if eligible.is_empty() {
            continue;
        }
        debug!(windows = eligible.len(), "enqueueing closed log windows");
        for window in eligible {
            // Backpressure from a full queue stalls only the sweeper.
            if upload_tx.send(window).await.is_err() {
                return;
            }
        }
    }
}

async fn upload_worker<C: Clock>(
    worker_id: usize,
    upload_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<MinuteWindow>>>,
    store: Arc<dyn ObjectStore>,
    log_refs: Arc<dyn LogReferenceStore>,
    clock: C,
    config: ArchiverConfig,
    metrics: Arc<ArchiverMetrics>,
) {
    loop {
        let window = { upload_rx.lock().await.recv().await };
        let Some(window) = window else {
            debug!(worker_id, "upload channel closed, worker exiting");
            return;
        };

        match upload_window(
            &window,
            store.as_ref(),
            log_refs.as_ref(),
            clock.utc_now(),
            config.protection_window,
        )
        .await
        {
            Ok(UploadOutcome::Skipped) => {
                metrics.skipped_uploads.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {
                metrics.uploaded_windows.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                // Best-effort: the window is lost, the system continues.
                metrics.failed_uploads.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, error = %e, "log window upload failed, dropping window");
            }
        }
    }
}

#[cfg(test)]
#[path = "archiver_tests.rs"]
mod tests;
