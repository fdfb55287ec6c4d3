// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event processor configuration.

use crate::lifecycle::ProcessorError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub rabbitmq_url: String,
    pub database_url: String,
    pub stale_check_interval: Duration,
    pub stale_threshold: Duration,
}

impl ProcessorConfig {
    pub fn from_env() -> Result<Self, ProcessorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ProcessorError> {
        Ok(Self {
            rabbitmq_url: required(&get, "RABBITMQ_URL")?,
            database_url: required(&get, "DATABASE_URL")?,
            stale_check_interval: Duration::from_secs(parse_or(
                &get,
                "STALE_CHECK_INTERVAL_SECS",
                60,
            )?),
            stale_threshold: Duration::from_secs(parse_or(&get, "STALE_THRESHOLD_SECS", 10)?),
        })
    }
}

fn required(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ProcessorError> {
    get(name)
        .filter(|v| !v.is_empty())
        .ok_or(ProcessorError::MissingConfig(name))
}

fn parse_or(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ProcessorError> {
    match get(name) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ProcessorError::InvalidConfig { name, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
