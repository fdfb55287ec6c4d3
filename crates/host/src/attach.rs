// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attach-stream fan-out.
//!
//! One read loop per running container. Demultiplexed frames become
//! lines, and every line goes to two sinks: the bus log stream (through
//! a bounded queue drained by a forwarder task) and the archiver. Either
//! sink may drop independently; the read loop itself never blocks on the
//! bus. Stream EOF hands off to crash detection.

use crate::publisher::HostPublisher;
use crate::session::SessionManager;
use manman_archiver::LogLine;
use manman_core::{Clock, LogSource, SessionId, SessionLogLine, SgcId};
use manman_docker::{FrameStream, LineAssembler, StreamKind};
use futures_util::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A log line queued for bus publication.
#[derive(Debug, Clone)]
pub struct ForwardedLine {
    pub session_id: SessionId,
    pub line: SessionLogLine,
}

/// Map a demultiplexed stream kind onto the log source tag.
pub fn source_for(kind: StreamKind) -> LogSource {
    match kind {
        StreamKind::Stderr => LogSource::Stderr,
        _ => LogSource::Stdout,
    }
}

/// Drain the bounded log queue onto the bus. Publish failures are
/// swallowed by the lossy path; an absent consumer never backs up the
/// host.
pub fn spawn_log_forwarder(
    publisher: Arc<HostPublisher>,
    mut rx: mpsc::Receiver<ForwardedLine>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(forwarded) = rx.recv().await {
            publisher
                .log_line(
                    forwarded.session_id,
                    forwarded.line.timestamp,
                    forwarded.line.source,
                    forwarded.line.message,
                )
                .await;
        }
        debug!("log forwarder drained");
    })
}

impl<C: Clock + 'static> SessionManager<C> {
    /// Spawn the read loop for one attached container.
    ///
    /// The reader remembers which container it was attached to; its EOF
    /// only counts against that container, so a stale reader from an
    /// evicted container can never finalize the session's replacement.
    pub(crate) fn spawn_attach_reader(
        self: Arc<Self>,
        session_id: SessionId,
        sgc_id: SgcId,
        container_id: String,
        mut frames: FrameStream,
    ) {
        tokio::spawn(async move {
            let mut assembler = LineAssembler::new();

            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(frame) => {
                        for (kind, text) in assembler.push(&frame) {
                            self.fan_out_line(session_id, sgc_id, kind, text);
                        }
                    }
                    Err(e) => {
                        warn!(%session_id, error = %e, "attach stream error");
                        break;
                    }
                }
            }
            for (kind, text) in assembler.finish() {
                self.fan_out_line(session_id, sgc_id, kind, text);
            }

            debug!(%session_id, "attach stream ended");
            self.handle_attach_eof(session_id, sgc_id, &container_id).await;
        });
    }

    /// Push one line to both sinks with non-blocking sends.
    pub(crate) fn fan_out_line(
        &self,
        session_id: SessionId,
        sgc_id: SgcId,
        kind: StreamKind,
        text: String,
    ) {
        let timestamp = self.clock.utc_now();
        let source = source_for(kind);

        // Bus stream: bounded queue, drop on full.
        let forwarded = ForwardedLine {
            session_id,
            line: SessionLogLine {
                timestamp,
                source,
                message: text.clone(),
            },
        };
        if self.log_tx.try_send(forwarded).is_err() {
            self.metrics.dropped_bus_lines.fetch_add(1, Ordering::Relaxed);
        }

        // Archiver: short in-memory mutexes only.
        self.archiver.ingest(LogLine {
            sgc_id,
            session_id,
            timestamp,
            source,
            message: text,
        });
    }
}

#[cfg(test)]
#[path = "attach_tests.rs"]
mod tests;
