// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-scoped bridge networks.
//!
//! Each session gets its own bridge so game containers cannot reach each
//! other's sockets; the network is labeled like everything else and
//! removed when the session terminates.

use crate::client::DockerClient;
use crate::error::DockerError;
use bollard::network::{CreateNetworkOptions, ListNetworksOptions};
use manman_core::{ContainerLabels, ServerId, SessionId, LABEL_SERVER_ID};
use std::collections::HashMap;
use tracing::debug;

/// Name of the isolated network for one session.
pub fn session_network_name(session_id: SessionId) -> String {
    format!("session-{session_id}")
}

/// A managed network discovered on the daemon.
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub name: String,
    pub labels: ContainerLabels,
}

impl DockerClient {
    /// Create the bridge network for a session; returns its name.
    /// An already-existing network of the same name is reused.
    pub async fn create_session_network(
        &self,
        labels: &ContainerLabels,
        session_id: SessionId,
    ) -> Result<String, DockerError> {
        let name = session_network_name(session_id);
        let result = self
            .call(self.raw().create_network(CreateNetworkOptions {
                name: name.clone(),
                driver: "bridge".to_string(),
                labels: labels.to_map(),
                ..CreateNetworkOptions::default()
            }))
            .await;
        match result {
            Ok(_) => {
                debug!(network = %name, "created session network");
                Ok(name)
            }
            // 409: the network survived a host restart; reuse it.
            Err(DockerError::Api(bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                ..
            })) => Ok(name),
            Err(e) => Err(e),
        }
    }

    /// Remove a network; already gone is success.
    pub async fn remove_network(&self, name: &str) -> Result<(), DockerError> {
        let result = self.call(self.raw().remove_network(name)).await;
        match result {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// All networks labeled with this server id.
    pub async fn list_managed_networks(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<NetworkInfo>, DockerError> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{LABEL_SERVER_ID}={server_id}")],
        );
        let networks = self
            .call(
                self.raw()
                    .list_networks(Some(ListNetworksOptions { filters })),
            )
            .await?;

        Ok(networks
            .into_iter()
            .filter_map(|network| {
                let labels = network.labels.as_ref().and_then(ContainerLabels::parse)?;
                Some(NetworkInfo {
                    name: network.name?,
                    labels,
                })
            })
            .collect())
    }
}
