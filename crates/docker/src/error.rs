// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for Docker operations.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("docker api error: {0}")]
    Api(#[from] bollard::errors::Error),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("docker call timed out after {0:?}")]
    Timeout(Duration),

    #[error("image pull failed for {image}: {detail}")]
    ImagePull { image: String, detail: String },

    #[error("attach failed: {0}")]
    Attach(String),

    #[error("unsupported docker api version: {0}")]
    ApiVersion(String),

    #[error("DOCKER_HOST is not usable: {0}")]
    Endpoint(String),
}

impl DockerError {
    /// Whether the underlying daemon response was a 404.
    ///
    /// Stop/remove paths treat missing containers as success so that
    /// commands stay idempotent.
    pub fn is_not_found(&self) -> bool {
        match self {
            DockerError::NotFound(_) => true,
            DockerError::Api(bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                ..
            }) => true,
            _ => false,
        }
    }
}
