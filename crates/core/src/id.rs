// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity identifiers.
//!
//! All ManMan entities are keyed by integer ids assigned by the control
//! plane. The newtypes keep server ids, session ids and so on from being
//! confused in signatures; on the wire they serialize as bare integers.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! int_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

int_id!(
    /// One execution host (a bare-metal machine running the host manager).
    ServerId
);
int_id!(
    /// One execution of one ServerGameConfig.
    SessionId
);
int_id!(
    /// A GameConfig deployed to a Server with concrete ports.
    SgcId
);
int_id!(
    /// Catalog entry for a game.
    GameId
);
int_id!(
    /// A workshop addon.
    AddonId
);
int_id!(
    /// One addon installation onto one SGC.
    InstallationId
);
int_id!(
    /// A collection of workshop addons (may reference other libraries).
    LibraryId
);

/// Deployment environment tag (e.g. `dev`, `prod`).
///
/// Stamped onto every container the host creates so that two environments
/// sharing a Docker daemon never reconcile each other's containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(pub String);

impl Environment {
    pub fn new(env: impl Into<String>) -> Self {
        Self(env.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Environment {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
