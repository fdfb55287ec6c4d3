// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed parameter resolution.
//!
//! Parameters are declared on the GameConfig, overridden per SGC, and
//! overridden again per session. Validation happens here, at merge time,
//! not at storage time; untyped keys (metadata the operator sneaks in)
//! pass through as opaque strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Int,
    Bool,
    /// Treated as a string but never logged.
    Secret,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Int => "int",
            ParameterKind::Bool => "bool",
            ParameterKind::Secret => "secret",
        }
    }

    fn validate(&self, value: &str) -> bool {
        match self {
            ParameterKind::String | ParameterKind::Secret => true,
            ParameterKind::Int => value.parse::<i64>().is_ok(),
            ParameterKind::Bool => matches!(value, "true" | "false"),
        }
    }
}

/// A parameter declaration on a GameConfig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Parameter validation failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("parameter {name} expects {kind} but got {value:?}")]
    Invalid {
        name: String,
        kind: &'static str,
        value: String,
    },

    #[error("required parameter {name} has no value")]
    MissingRequired { name: String },
}

/// Resolve the effective parameter map for a session.
///
/// Merge order is GameConfig defaults, then SGC overrides, then session
/// parameters; later layers win. Values for declared parameters are
/// validated against their kind. Keys with no declaration are carried
/// through untouched.
pub fn resolve_parameters(
    specs: &[ParameterSpec],
    sgc_overrides: &HashMap<String, String>,
    session_params: &HashMap<String, String>,
) -> Result<HashMap<String, String>, ParameterError> {
    let mut resolved: HashMap<String, String> = HashMap::new();

    for spec in specs {
        if let Some(default) = &spec.default {
            resolved.insert(spec.name.clone(), default.clone());
        }
    }
    for (k, v) in sgc_overrides {
        resolved.insert(k.clone(), v.clone());
    }
    for (k, v) in session_params {
        resolved.insert(k.clone(), v.clone());
    }

    for spec in specs {
        match resolved.get(&spec.name) {
            Some(value) => {
                if !spec.kind.validate(value) {
                    // Never echo secret values back in errors.
                    let shown = match spec.kind {
                        ParameterKind::Secret => "<redacted>".to_string(),
                        _ => value.clone(),
                    };
                    return Err(ParameterError::Invalid {
                        name: spec.name.clone(),
                        kind: spec.kind.as_str(),
                        value: shown,
                    });
                }
            }
            None if spec.required => {
                return Err(ParameterError::MissingRequired {
                    name: spec.name.clone(),
                })
            }
            None => {}
        }
    }

    Ok(resolved)
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
