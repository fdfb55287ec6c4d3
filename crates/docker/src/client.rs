// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection setup and call deadlines.

use crate::error::DockerError;
use bollard::{Docker, API_DEFAULT_VERSION};
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Minimum daemon API version; attach framing and platform-aware create
/// both predate this, so anything newer is fine.
const MIN_API_MAJOR: usize = 1;
const MIN_API_MINOR: usize = 41;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shared Docker client with a bounded per-call deadline.
///
/// bollard's `Docker` is internally reference-counted; cloning this is
/// cheap and safe for concurrent use.
#[derive(Clone)]
pub struct DockerClient {
    inner: Docker,
    deadline: Duration,
}

impl DockerClient {
    /// Connect using `DOCKER_HOST` when set (tcp/http or unix socket
    /// path), the platform default socket otherwise, and verify the
    /// daemon speaks a supported API version.
    ///
    /// An unreachable daemon is a startup-fatal configuration error for
    /// every caller, so this returns rather than retries.
    pub async fn connect(docker_host: Option<&str>, deadline: Duration) -> Result<Self, DockerError> {
        let inner = match docker_host {
            Some(host) if host.starts_with("tcp://") || host.starts_with("http://") => {
                Docker::connect_with_http(host, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            Some(host) => {
                let path = host.strip_prefix("unix://").unwrap_or(host);
                Docker::connect_with_unix(path, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            None => Docker::connect_with_local_defaults()?,
        };

        let client = Self { inner, deadline };
        client.check_api_version().await?;
        Ok(client)
    }

    async fn check_api_version(&self) -> Result<(), DockerError> {
        let version = self.call(self.inner.version()).await?;
        let api_version = version
            .api_version
            .ok_or_else(|| DockerError::ApiVersion("daemon reported no API version".to_string()))?;

        let mut parts = api_version.split('.');
        let major: usize = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| DockerError::ApiVersion(api_version.clone()))?;
        let minor: usize = parts
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| DockerError::ApiVersion(api_version.clone()))?;

        if major < MIN_API_MAJOR || (major == MIN_API_MAJOR && minor < MIN_API_MINOR) {
            return Err(DockerError::ApiVersion(format!(
                "daemon supports {api_version}, need at least {MIN_API_MAJOR}.{MIN_API_MINOR}"
            )));
        }

        info!(api_version, "connected to docker daemon");
        Ok(())
    }

    pub(crate) fn raw(&self) -> &Docker {
        &self.inner
    }

    /// Run a daemon call under this client's deadline.
    pub(crate) async fn call<T, F>(&self, fut: F) -> Result<T, DockerError>
    where
        F: Future<Output = Result<T, bollard::errors::Error>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DockerError::Timeout(self.deadline)),
        }
    }
}
