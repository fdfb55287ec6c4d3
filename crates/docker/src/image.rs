// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Image pulls.

use crate::client::DockerClient;
use crate::error::DockerError;
use bollard::image::CreateImageOptions;
use futures_util::StreamExt;
use tracing::{debug, info};

impl DockerClient {
    /// Pull an image, draining the daemon's progress stream.
    ///
    /// An error item anywhere in the stream aborts the pull; the caller
    /// reports the session as crashed with the detail.
    pub async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        info!(image, "pulling image");
        let mut stream = self.raw().create_image(
            Some(CreateImageOptions::<String> {
                from_image: image.to_string(),
                ..CreateImageOptions::default()
            }),
            None,
            None,
        );

        while let Some(item) = stream.next().await {
            let item = item.map_err(|e| DockerError::ImagePull {
                image: image.to_string(),
                detail: e.to_string(),
            })?;
            if let Some(error) = item.error {
                return Err(DockerError::ImagePull {
                    image: image.to_string(),
                    detail: error,
                });
            }
            if let Some(status) = item.status {
                debug!(image, status, "pull progress");
            }
        }
        Ok(())
    }
}
