// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workshop catalog snapshots.
//!
//! Libraries group addons and may include other libraries; the control
//! plane resolves them into these snapshots when asking a host to ensure
//! an SGC's addons are materialized before a session starts.

use crate::id::{AddonId, LibraryId};
use serde::{Deserialize, Serialize};

/// One addon as the downloader needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSpec {
    pub addon_id: AddonId,
    /// Steam workshop item id.
    pub workshop_id: String,
    pub steam_app_id: u32,
    /// Path inside the game volume where the addon lands.
    pub install_path: String,
}

/// A library of addons, possibly including other libraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub library_id: LibraryId,
    #[serde(default)]
    pub addons: Vec<AddonSpec>,
    #[serde(default)]
    pub includes: Vec<LibrarySpec>,
}
