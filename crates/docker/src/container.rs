// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container lifecycle operations.
//!
//! Specs are built from the domain types in `manman-core` and rendered
//! into bollard's create config in one place, so every container the host
//! creates carries the same label set, stdin flags, and mount layout.

use crate::client::DockerClient;
use crate::error::DockerError;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::models::{HostConfig, PortBinding as DockerPortBinding};
use futures_util::StreamExt;
use manman_core::{ContainerLabels, PortBinding, ServerId, VolumeMount, LABEL_SERVER_ID};
use std::collections::HashMap;
use tracing::debug;

/// Everything needed to create one managed container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub entrypoint: Option<Vec<String>>,
    pub cmd: Option<Vec<String>>,
    pub env: HashMap<String, String>,
    pub labels: ContainerLabels,
    pub port_bindings: Vec<PortBinding>,
    pub mounts: Vec<VolumeMount>,
    /// Attach to this network instead of the default bridge.
    pub network: Option<String>,
    /// Keep stdin open across detaches (game sessions); workshop
    /// downloads run without a terminal.
    pub interactive: bool,
}

impl ContainerSpec {
    /// Render into bollard's create config.
    ///
    /// Interactive containers get `Tty`, `OpenStdin` and `StdinOnce=false`
    /// so stdin survives a detach and a restarted host can re-attach.
    pub(crate) fn to_config(&self) -> Config<String> {
        let env: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let binds: Vec<String> = self
            .mounts
            .iter()
            .map(|m| {
                if m.read_only {
                    format!("{}:{}:ro", m.source, m.target)
                } else {
                    format!("{}:{}", m.source, m.target)
                }
            })
            .collect();

        let mut exposed_ports: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut port_map: HashMap<String, Option<Vec<DockerPortBinding>>> = HashMap::new();
        for binding in &self.port_bindings {
            let key = format!("{}/{}", binding.container_port, binding.protocol);
            exposed_ports.insert(key.clone(), HashMap::new());
            port_map.insert(
                key,
                Some(vec![DockerPortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(binding.host_port.to_string()),
                }]),
            );
        }

        Config {
            image: Some(self.image.clone()),
            entrypoint: self.entrypoint.clone(),
            cmd: self.cmd.clone(),
            env: Some(env),
            labels: Some(self.labels.to_map()),
            tty: Some(self.interactive),
            open_stdin: Some(self.interactive),
            stdin_once: Some(false),
            attach_stdin: Some(self.interactive),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
            host_config: Some(HostConfig {
                binds: (!binds.is_empty()).then_some(binds),
                port_bindings: (!port_map.is_empty()).then_some(port_map),
                network_mode: self.network.clone(),
                ..HostConfig::default()
            }),
            ..Config::default()
        }
    }
}

/// Coarse container run state as reported by list/inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Exited,
    Other,
}

/// A managed container discovered on the daemon.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub labels: ContainerLabels,
    pub status: ContainerStatus,
}

impl DockerClient {
    /// Create a container from a spec; returns the container id.
    pub async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let response = self
            .call(self.raw().create_container(Some(options), spec.to_config()))
            .await?;
        debug!(container_id = %response.id, name = %spec.name, "created container");
        Ok(response.id)
    }

    pub async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        self.call(self.raw().start_container::<String>(id, None))
            .await
    }

    /// Graceful stop with the given daemon-side timeout in seconds.
    /// Already-gone containers are success.
    pub async fn stop_container(&self, id: &str, timeout_secs: i64) -> Result<(), DockerError> {
        let result = self
            .call(
                self.raw()
                    .stop_container(id, Some(StopContainerOptions { t: timeout_secs })),
            )
            .await;
        match result {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Remove a container; `force` kills a running one first.
    /// Already-gone containers are success.
    pub async fn remove_container(&self, id: &str, force: bool) -> Result<(), DockerError> {
        let result = self
            .call(self.raw().remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..RemoveContainerOptions::default()
                }),
            ))
            .await;
        match result {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Exit code from inspect; `None` while still running.
    pub async fn exit_code(&self, id: &str) -> Result<Option<i64>, DockerError> {
        let inspect = self
            .call(
                self.raw()
                    .inspect_container(id, None::<InspectContainerOptions>),
            )
            .await?;
        let state = inspect.state.as_ref();
        if state.and_then(|s| s.running).unwrap_or(false) {
            return Ok(None);
        }
        Ok(state.and_then(|s| s.exit_code))
    }

    /// Block until the container exits; returns its exit code.
    pub async fn wait_container(&self, id: &str) -> Result<i64, DockerError> {
        let mut stream = self
            .raw()
            .wait_container(id, None::<WaitContainerOptions<String>>);
        // wait has no sensible deadline: a game session runs for hours.
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            None => Err(DockerError::NotFound(id.to_string())),
        }
    }

    /// All containers (running or not) labeled with this server id.
    pub async fn list_managed(&self, server_id: ServerId) -> Result<Vec<ContainerInfo>, DockerError> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{LABEL_SERVER_ID}={server_id}")],
        );
        let summaries = self
            .call(self.raw().list_containers(Some(ListContainersOptions {
                all: true,
                filters,
                ..ListContainersOptions::default()
            })))
            .await?;

        let mut containers = Vec::new();
        for summary in summaries {
            let Some(labels) = summary.labels.as_ref().and_then(ContainerLabels::parse) else {
                continue;
            };
            let Some(id) = summary.id else { continue };
            let name = summary
                .names
                .as_ref()
                .and_then(|names| names.first())
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default();
            let status = match summary.state.as_deref() {
                Some("running") => ContainerStatus::Running,
                Some("exited") | Some("dead") => ContainerStatus::Exited,
                _ => ContainerStatus::Other,
            };
            containers.push(ContainerInfo {
                id,
                name,
                labels,
                status,
            });
        }
        Ok(containers)
    }

    /// Find a container by exact name, if present.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<String>, DockerError> {
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![format!("^/{name}$")]);
        let summaries = self
            .call(self.raw().list_containers(Some(ListContainersOptions {
                all: true,
                filters,
                ..ListContainersOptions::default()
            })))
            .await?;
        Ok(summaries.into_iter().find_map(|s| s.id))
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
