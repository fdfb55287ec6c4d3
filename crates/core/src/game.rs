// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Game configuration snapshots.
//!
//! The control plane resolves GameConfig + ServerGameConfig into concrete
//! snapshots before publishing a start command, so the host never reads
//! the database. Argv and environment templates may contain `{{param}}`
//! placeholders substituted from the resolved parameter map at start time.

use crate::id::SgcId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl PortProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortProtocol::Tcp => "tcp",
            PortProtocol::Udp => "udp",
        }
    }
}

impl fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(PortProtocol::Tcp),
            "udp" => Ok(PortProtocol::Udp),
            other => Err(format!("unknown port protocol: {other}")),
        }
    }
}

/// Concrete container-port to host-port mapping on 0.0.0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    pub protocol: PortProtocol,
    pub container_port: u16,
    pub host_port: u16,
}

/// A declared volume. Sources starting with `/` or `.` are bind mounts,
/// anything else names a Docker volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeMount {
    pub fn is_bind(&self) -> bool {
        self.source.starts_with('/') || self.source.starts_with('.')
    }
}

/// Reusable game template, snapshotted into the start command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfigSnapshot {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Extra argv appended after `command`, may contain `{{param}}`.
    #[serde(default)]
    pub args_template: Vec<String>,
    /// Environment template, values may contain `{{param}}`.
    #[serde(default)]
    pub env_template: HashMap<String, String>,
}

impl GameConfigSnapshot {
    /// Render the argv template against resolved parameters.
    pub fn rendered_args(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<String>, RenderError> {
        self.args_template
            .iter()
            .map(|arg| render(arg, params))
            .collect()
    }

    /// Render the environment template against resolved parameters.
    pub fn rendered_env(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, RenderError> {
        self.env_template
            .iter()
            .map(|(k, v)| Ok((k.clone(), render(v, params)?)))
            .collect()
    }
}

/// One deployment of a GameConfig to a server, snapshotted into the start
/// command with concrete ports and mounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SgcSnapshot {
    #[serde(default)]
    pub sgc_id: Option<SgcId>,
    #[serde(default)]
    pub port_bindings: Vec<PortBinding>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    /// Parameter overrides layered over GameConfig defaults.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// Template rendering failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unresolved placeholder {{{{{name}}}}}")]
    UnresolvedPlaceholder { name: String },
}

/// Substitute every `{{name}}` in `input` from `params`.
///
/// A placeholder with no matching parameter is an error rather than an
/// empty string: passing a game server a blank port or password silently
/// is worse than refusing to start.
fn render(input: &str, params: &HashMap<String, String>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(RenderError::UnresolvedPlaceholder {
                            name: name.to_string(),
                        })
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated braces pass through verbatim.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
#[path = "game_tests.rs"]
mod tests;
