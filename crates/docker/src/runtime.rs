// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container-runtime seam.
//!
//! Host-manager logic depends on this trait, not on the daemon client,
//! so session lifecycle, reconciliation, sweeping and workshop downloads
//! are all unit-testable against [`FakeDocker`] without a Docker socket.

use crate::attach::AttachHandle;
use crate::client::DockerClient;
use crate::container::{ContainerInfo, ContainerSpec};
use crate::error::DockerError;
use crate::network::NetworkInfo;
use async_trait::async_trait;
use manman_core::{ContainerLabels, ServerId, SessionId};

/// Everything the host asks of its container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &str) -> Result<(), DockerError>;

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError>;

    async fn start_container(&self, id: &str) -> Result<(), DockerError>;

    async fn stop_container(&self, id: &str, timeout_secs: i64) -> Result<(), DockerError>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), DockerError>;

    async fn exit_code(&self, id: &str) -> Result<Option<i64>, DockerError>;

    async fn wait_container(&self, id: &str) -> Result<i64, DockerError>;

    async fn attach(&self, id: &str) -> Result<AttachHandle, DockerError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<String>, DockerError>;

    async fn list_managed(&self, server_id: ServerId) -> Result<Vec<ContainerInfo>, DockerError>;

    async fn create_session_network(
        &self,
        labels: &ContainerLabels,
        session_id: SessionId,
    ) -> Result<String, DockerError>;

    async fn remove_network(&self, name: &str) -> Result<(), DockerError>;

    async fn list_managed_networks(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<NetworkInfo>, DockerError>;
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        DockerClient::pull_image(self, image).await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        DockerClient::create_container(self, spec).await
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        DockerClient::start_container(self, id).await
    }

    async fn stop_container(&self, id: &str, timeout_secs: i64) -> Result<(), DockerError> {
        DockerClient::stop_container(self, id, timeout_secs).await
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), DockerError> {
        DockerClient::remove_container(self, id, force).await
    }

    async fn exit_code(&self, id: &str) -> Result<Option<i64>, DockerError> {
        DockerClient::exit_code(self, id).await
    }

    async fn wait_container(&self, id: &str) -> Result<i64, DockerError> {
        DockerClient::wait_container(self, id).await
    }

    async fn attach(&self, id: &str) -> Result<AttachHandle, DockerError> {
        DockerClient::attach(self, id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<String>, DockerError> {
        DockerClient::find_by_name(self, name).await
    }

    async fn list_managed(&self, server_id: ServerId) -> Result<Vec<ContainerInfo>, DockerError> {
        DockerClient::list_managed(self, server_id).await
    }

    async fn create_session_network(
        &self,
        labels: &ContainerLabels,
        session_id: SessionId,
    ) -> Result<String, DockerError> {
        DockerClient::create_session_network(self, labels, session_id).await
    }

    async fn remove_network(&self, name: &str) -> Result<(), DockerError> {
        DockerClient::remove_network(self, name).await
    }

    async fn list_managed_networks(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<NetworkInfo>, DockerError> {
        DockerClient::list_managed_networks(self, server_id).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDocker;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use crate::container::ContainerStatus;
    use crate::demux::{Frame, StreamKind};
    use bytes::Bytes;
    use futures_util::StreamExt;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::AsyncWrite;
    use tokio::sync::mpsc;

    struct FakeContainer {
        spec: ContainerSpec,
        running: bool,
        exit_code: Option<i64>,
        attach_tx: Option<mpsc::UnboundedSender<Frame>>,
        stdin: Arc<Mutex<Vec<u8>>>,
    }

    /// In-memory runtime fake.
    ///
    /// Containers and networks live in maps; `attach` hands back a frame
    /// stream the test can feed and close, and a stdin writer whose
    /// bytes the test can read back.
    #[derive(Default)]
    pub struct FakeDocker {
        containers: Mutex<HashMap<String, FakeContainer>>,
        networks: Mutex<HashMap<String, ContainerLabels>>,
        next_id: AtomicU64,
        created_total: AtomicU64,
        fail_create: Mutex<Option<String>>,
    }

    impl FakeDocker {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next create_container fail with the given detail.
        pub fn fail_next_create(&self, detail: &str) {
            *self.fail_create.lock() = Some(detail.to_string());
        }

        /// Ids of containers currently present (running or not).
        pub fn container_ids(&self) -> Vec<String> {
            let mut ids: Vec<String> = self.containers.lock().keys().cloned().collect();
            ids.sort();
            ids
        }

        /// How many containers were ever created.
        pub fn created_total(&self) -> u64 {
            self.created_total.load(Ordering::Relaxed)
        }

        pub fn network_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.networks.lock().keys().cloned().collect();
            names.sort();
            names
        }

        pub fn is_running(&self, id: &str) -> bool {
            self.containers
                .lock()
                .get(id)
                .map(|c| c.running)
                .unwrap_or(false)
        }

        /// Bytes written to a container's stdin so far.
        pub fn stdin_bytes(&self, id: &str) -> Vec<u8> {
            self.containers
                .lock()
                .get(id)
                .map(|c| c.stdin.lock().clone())
                .unwrap_or_default()
        }

        /// Push output onto an attached container's stream.
        pub fn feed_stdout(&self, id: &str, bytes: &[u8]) {
            if let Some(tx) = self
                .containers
                .lock()
                .get(id)
                .and_then(|c| c.attach_tx.as_ref())
            {
                let _ = tx.send(Frame {
                    kind: StreamKind::Stdout,
                    payload: Bytes::copy_from_slice(bytes),
                });
            }
        }

        /// Simulate the container's process ending on its own: record
        /// the exit code, stop it, and EOF the attach stream.
        pub fn finish_container(&self, id: &str, exit_code: i64) {
            if let Some(container) = self.containers.lock().get_mut(id) {
                container.running = false;
                container.exit_code = Some(exit_code);
                container.attach_tx = None;
            }
        }
    }

    /// Stdin sink that records everything written.
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl AsyncWrite for CaptureWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.0.lock().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeDocker {
        async fn pull_image(&self, _image: &str) -> Result<(), DockerError> {
            Ok(())
        }

        async fn create_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
            if let Some(detail) = self.fail_create.lock().take() {
                return Err(DockerError::ImagePull {
                    image: spec.image.clone(),
                    detail,
                });
            }
            let id = format!("ctr-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
            self.containers.lock().insert(
                id.clone(),
                FakeContainer {
                    spec: spec.clone(),
                    running: false,
                    exit_code: None,
                    attach_tx: None,
                    stdin: Arc::new(Mutex::new(Vec::new())),
                },
            );
            self.created_total.fetch_add(1, Ordering::Relaxed);
            Ok(id)
        }

        async fn start_container(&self, id: &str) -> Result<(), DockerError> {
            match self.containers.lock().get_mut(id) {
                Some(container) => {
                    container.running = true;
                    Ok(())
                }
                None => Err(DockerError::NotFound(id.to_string())),
            }
        }

        async fn stop_container(&self, id: &str, _timeout_secs: i64) -> Result<(), DockerError> {
            if let Some(container) = self.containers.lock().get_mut(id) {
                if container.running {
                    container.running = false;
                    container.exit_code.get_or_insert(0);
                    container.attach_tx = None;
                }
            }
            Ok(())
        }

        async fn remove_container(&self, id: &str, _force: bool) -> Result<(), DockerError> {
            self.containers.lock().remove(id);
            Ok(())
        }

        async fn exit_code(&self, id: &str) -> Result<Option<i64>, DockerError> {
            match self.containers.lock().get(id) {
                Some(container) if container.running => Ok(None),
                Some(container) => Ok(container.exit_code.or(Some(0))),
                None => Err(DockerError::NotFound(id.to_string())),
            }
        }

        async fn wait_container(&self, id: &str) -> Result<i64, DockerError> {
            loop {
                {
                    let containers = self.containers.lock();
                    match containers.get(id) {
                        Some(container) if !container.running => {
                            return Ok(container.exit_code.unwrap_or(0));
                        }
                        Some(_) => {}
                        None => return Err(DockerError::NotFound(id.to_string())),
                    }
                }
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        }

        async fn attach(&self, id: &str) -> Result<AttachHandle, DockerError> {
            let (tx, rx) = mpsc::unbounded_channel::<Frame>();
            let stdin = {
                let mut containers = self.containers.lock();
                let container = containers
                    .get_mut(id)
                    .ok_or_else(|| DockerError::NotFound(id.to_string()))?;
                container.attach_tx = Some(tx);
                Arc::clone(&container.stdin)
            };

            let frames = futures_util::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|frame| (Ok(frame), rx))
            })
            .boxed();
            Ok(AttachHandle::from_parts(
                frames,
                Box::pin(CaptureWriter(stdin)),
            ))
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<String>, DockerError> {
            Ok(self
                .containers
                .lock()
                .iter()
                .find(|(_, container)| container.spec.name == name)
                .map(|(id, _)| id.clone()))
        }

        async fn list_managed(
            &self,
            server_id: ServerId,
        ) -> Result<Vec<ContainerInfo>, DockerError> {
            Ok(self
                .containers
                .lock()
                .iter()
                .filter(|(_, container)| container.spec.labels.server_id == server_id)
                .map(|(id, container)| ContainerInfo {
                    id: id.clone(),
                    name: container.spec.name.clone(),
                    labels: container.spec.labels.clone(),
                    status: if container.running {
                        ContainerStatus::Running
                    } else {
                        ContainerStatus::Exited
                    },
                })
                .collect())
        }

        async fn create_session_network(
            &self,
            labels: &ContainerLabels,
            session_id: SessionId,
        ) -> Result<String, DockerError> {
            let name = crate::network::session_network_name(session_id);
            self.networks.lock().insert(name.clone(), labels.clone());
            Ok(name)
        }

        async fn remove_network(&self, name: &str) -> Result<(), DockerError> {
            self.networks.lock().remove(name);
            Ok(())
        }

        async fn list_managed_networks(
            &self,
            server_id: ServerId,
        ) -> Result<Vec<NetworkInfo>, DockerError> {
            Ok(self
                .networks
                .lock()
                .iter()
                .filter(|(_, labels)| labels.server_id == server_id)
                .map(|(name, labels)| NetworkInfo {
                    name: name.clone(),
                    labels: labels.clone(),
                })
                .collect())
        }
    }
}
