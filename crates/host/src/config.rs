// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host manager configuration.
//!
//! Everything comes from the environment and is validated eagerly; a bad
//! value is fatal at startup rather than a surprise mid-session. The
//! host/internal data-dir pair exists because `hostd` itself runs in a
//! container: volume declarations name paths as `hostd` sees them, while
//! Docker bind mounts need the path as the machine sees it.

use manman_core::{Environment, ServerId};
use manman_storage::S3Config;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub server_id: ServerId,
    pub environment: Environment,
    pub rabbitmq_url: String,
    pub database_url: String,
    pub s3: S3Config,
    pub docker_host: Option<String>,
    /// Bind-mount source root as the machine sees it.
    pub host_data_dir: String,
    /// The same directory as seen from inside hostd's own container.
    pub internal_data_dir: String,
    pub max_concurrent_downloads: usize,
    pub log_buffer_ttl_ms: u32,
    pub log_buffer_max_messages: u32,
    pub heartbeat_interval: Duration,
    pub sweep_interval: Duration,
    pub sweep_grace: Duration,
    /// Graceful stop timeout handed to the Docker daemon.
    pub stop_timeout: Duration,
    /// Deadline applied to individual Docker API calls.
    pub docker_deadline: Duration,
}

impl HostConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Testable constructor over any name -> value lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_id = ServerId::new(parse_required(&get, "SERVER_ID")?);
        let environment = Environment::new(required(&get, "ENVIRONMENT")?);
        let rabbitmq_url = required(&get, "RABBITMQ_URL")?;
        let database_url = required(&get, "DATABASE_URL")?;
        let s3 = S3Config {
            bucket: required(&get, "S3_BUCKET")?,
            region: required(&get, "S3_REGION")?,
            endpoint: get("S3_ENDPOINT").filter(|v| !v.is_empty()),
        };
        let host_data_dir = required(&get, "HOST_DATA_DIR")?;
        let internal_data_dir = required(&get, "INTERNAL_DATA_DIR")?;

        Ok(Self {
            server_id,
            environment,
            rabbitmq_url,
            database_url,
            s3,
            docker_host: get("DOCKER_HOST").filter(|v| !v.is_empty()),
            host_data_dir,
            internal_data_dir,
            max_concurrent_downloads: parse_or(&get, "MAX_CONCURRENT_DOWNLOADS", 2)?,
            log_buffer_ttl_ms: parse_or(&get, "LOG_BUFFER_TTL", 180_000)?,
            log_buffer_max_messages: parse_or(&get, "LOG_BUFFER_MAX_MESSAGES", 500)?,
            heartbeat_interval: Duration::from_secs(parse_or(&get, "HEARTBEAT_INTERVAL_SECS", 5)?),
            sweep_interval: Duration::from_secs(parse_or(&get, "SWEEP_INTERVAL_SECS", 300)?),
            sweep_grace: Duration::from_secs(parse_or(&get, "SWEEP_GRACE_SECS", 300)?),
            stop_timeout: Duration::from_secs(parse_or(&get, "STOP_TIMEOUT_SECS", 30)?),
            docker_deadline: Duration::from_secs(parse_or(&get, "DOCKER_DEADLINE_SECS", 30)?),
        })
    }

    /// Translate a volume source path from hostd's view to the machine's.
    ///
    /// Absolute paths under the internal data dir are re-rooted onto the
    /// host data dir; relative sources are resolved under the host data
    /// dir; anything else (named volumes, foreign absolute paths) passes
    /// through untouched.
    pub fn host_path(&self, source: &str) -> String {
        if let Some(rest) = source.strip_prefix(&self.internal_data_dir) {
            format!("{}{}", self.host_data_dir, rest)
        } else if let Some(rest) = source.strip_prefix("./") {
            format!("{}/{}", self.host_data_dir, rest)
        } else {
            source.to_string()
        }
    }

    /// The same path as hostd itself can reach it (for mkdir and chmod
    /// ahead of a workshop download).
    pub fn internal_path(&self, source: &str) -> String {
        if let Some(rest) = source.strip_prefix(&self.host_data_dir) {
            format!("{}{}", self.internal_data_dir, rest)
        } else if let Some(rest) = source.strip_prefix("./") {
            format!("{}/{}", self.internal_data_dir, rest)
        } else {
            source.to_string()
        }
    }
}

fn required(get: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<String, ConfigError> {
    get(name)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_required(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<i64, ConfigError> {
    let value = required(get, name)?;
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
