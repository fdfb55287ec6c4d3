// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bidirectional container attach.
//!
//! One attach connection per running container: the read side yields
//! demultiplexed [`Frame`]s, the write side is raw stdin (no framing).
//! Stream EOF is the caller's crash signal when no stop is pending.

use crate::client::DockerClient;
use crate::demux::{Frame, StreamKind};
use crate::error::DockerError;
use bollard::container::{AttachContainerOptions, LogOutput};
use futures_util::{Stream, StreamExt};
use std::pin::Pin;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Demultiplexed read side of an attach connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, DockerError>> + Send>>;

/// Live attach connection to one container.
pub struct AttachHandle {
    pub frames: FrameStream,
    stdin: Pin<Box<dyn AsyncWrite + Send>>,
}

impl AttachHandle {
    /// Assemble a handle from its halves (used by runtime fakes).
    pub(crate) fn from_parts(
        frames: FrameStream,
        stdin: Pin<Box<dyn AsyncWrite + Send>>,
    ) -> Self {
        Self { frames, stdin }
    }

    /// Split into the frame stream and a writer, so reads and writes can
    /// live on different tasks.
    pub fn split(self) -> (FrameStream, StdinWriter) {
        (self.frames, StdinWriter { inner: self.stdin })
    }
}

/// Owned stdin half of an attach connection.
pub struct StdinWriter {
    inner: Pin<Box<dyn AsyncWrite + Send>>,
}

impl StdinWriter {
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), DockerError> {
        self.inner
            .write_all(bytes)
            .await
            .map_err(|e| DockerError::Attach(format!("stdin write failed: {e}")))?;
        self.inner
            .flush()
            .await
            .map_err(|e| DockerError::Attach(format!("stdin flush failed: {e}")))
    }
}

fn frame_from_output(output: LogOutput) -> Frame {
    match output {
        LogOutput::StdOut { message } => Frame {
            kind: StreamKind::Stdout,
            payload: message,
        },
        LogOutput::StdErr { message } => Frame {
            kind: StreamKind::Stderr,
            payload: message,
        },
        LogOutput::StdIn { message } => Frame {
            kind: StreamKind::Stdin,
            payload: message,
        },
        // Tty containers produce one raw console stream; treat it as
        // stdout for log purposes.
        LogOutput::Console { message } => Frame {
            kind: StreamKind::Stdout,
            payload: message,
        },
    }
}

impl DockerClient {
    /// Open the attach connection for a running container.
    ///
    /// `logs=false`: history is the archiver's job; attach only forwards
    /// from now on, which keeps re-attach after a host restart from
    /// double-ingesting old lines.
    pub async fn attach(&self, id: &str) -> Result<AttachHandle, DockerError> {
        let results = self
            .call(self.raw().attach_container(
                id,
                Some(AttachContainerOptions::<String> {
                    stdin: Some(true),
                    stdout: Some(true),
                    stderr: Some(true),
                    stream: Some(true),
                    logs: Some(false),
                    detach_keys: None,
                }),
            ))
            .await?;

        let frames: FrameStream = results
            .output
            .map(|item| item.map(frame_from_output).map_err(DockerError::from))
            .boxed();

        Ok(AttachHandle {
            frames,
            stdin: results.input,
        })
    }
}
