// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker client wrapper for the ManMan host manager.
//!
//! Thin, typed layer over bollard: connection setup with API-version
//! checking, labeled container/network lifecycle, image pulls, and the
//! attach-stream plumbing (frame demultiplexing and line assembly) the
//! host's log pipeline consumes. Every daemon call runs under a bounded
//! deadline.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod attach;
mod client;
mod container;
mod demux;
mod error;
mod image;
mod network;
mod runtime;

pub use attach::{AttachHandle, FrameStream, StdinWriter};
pub use client::DockerClient;
pub use container::{ContainerInfo, ContainerSpec, ContainerStatus};
pub use demux::{Frame, FrameDecoder, LineAssembler, StreamKind};
pub use error::DockerError;
pub use network::{session_network_name, NetworkInfo};
pub use runtime::ContainerRuntime;

#[cfg(any(test, feature = "test-support"))]
pub use runtime::FakeDocker;
