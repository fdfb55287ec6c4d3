// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared domain types for the ManMan control system.
//!
//! Everything the execution plane (host manager) and the control plane
//! (event processor) agree on lives here: entity identifiers, the session
//! state machine, the container label contract, game-config snapshots,
//! parameter resolution, bus message payloads and routing keys, and the
//! clock abstraction used to make time-driven code testable.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod clock;
mod game;
mod id;
mod labels;
mod message;
mod params;
mod routing;
mod session;
mod workshop;

pub use clock::{Clock, FakeClock, SystemClock};
pub use game::{
    GameConfigSnapshot, PortBinding, PortProtocol, RenderError, SgcSnapshot, VolumeMount,
};
pub use id::{
    AddonId, Environment, GameId, InstallationId, LibraryId, ServerId, SessionId, SgcId,
};
pub use labels::{
    ContainerLabels, ManagedType, LABEL_CREATED_AT, LABEL_ENVIRONMENT, LABEL_SERVER_ID,
    LABEL_SESSION_ID, LABEL_SGC_ID, LABEL_TYPE,
};
pub use message::{
    CommandDecodeError, DownloadAddonCommand, HostCommand, HostHealthUpdate, HostStatus,
    HostStatusUpdate, InstallationStatus, InstallationStatusUpdate, KillSessionCommand,
    LogSource, SendInputCommand, SessionLogLine, SessionStatusUpdate, StartSessionCommand,
    StopSessionCommand,
};
pub use params::{resolve_parameters, ParameterError, ParameterKind, ParameterSpec};
pub use routing::{CommandKind, ExternalHostEvent, RoutingKey};
pub use session::{SessionStats, SessionStatus};
pub use workshop::{AddonSpec, LibrarySpec};
