// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workshop download orchestration.
//!
//! Disposable SteamCMD containers materialize addons into the volume a
//! future game session will mount. Concurrency is bounded by a
//! semaphore, duplicate commands for an in-flight installation are
//! dropped, progress is scraped from the download log, and the
//! container is always removed.

use crate::config::HostConfig;
use crate::lifecycle::HostError;
use crate::publisher::HostPublisher;
use manman_core::{
    AddonId, AddonSpec, Clock, ContainerLabels, DownloadAddonCommand, InstallationId,
    InstallationStatus, LibrarySpec, SgcId, VolumeMount,
};
use manman_docker::{ContainerRuntime, ContainerSpec, LineAssembler};
use futures_util::StreamExt;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const STEAMCMD_IMAGE: &str = "steamcmd/steamcmd:latest";

fn progress_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)%").ok()).as_ref()
}

/// Extract a percentage from a SteamCMD progress line.
pub fn parse_progress(line: &str) -> Option<u8> {
    let captures = progress_regex()?.captures(line)?;
    let value: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(value.min(100) as u8)
}

/// Flatten a library graph into its addons.
///
/// Breadth-first over includes, deduplicated by addon id (first
/// occurrence wins) and by library id (include cycles terminate).
pub fn expand_libraries(libraries: &[LibrarySpec]) -> Vec<AddonSpec> {
    let mut queue: VecDeque<&LibrarySpec> = libraries.iter().collect();
    let mut seen_libraries = HashSet::new();
    let mut seen_addons = HashSet::new();
    let mut addons = Vec::new();

    while let Some(library) = queue.pop_front() {
        if !seen_libraries.insert(library.library_id) {
            continue;
        }
        for addon in &library.addons {
            if seen_addons.insert(addon.addon_id) {
                addons.push(addon.clone());
            }
        }
        queue.extend(library.includes.iter());
    }
    addons
}

/// Decide which library addons still need a download.
///
/// Addons whose installation is already `installed` are skipped; addons
/// with no installation record cannot be reported on and are skipped
/// with a warning at execution time.
pub fn plan_downloads(
    libraries: &[LibrarySpec],
    installations: &HashMap<AddonId, (InstallationId, InstallationStatus)>,
) -> Vec<(InstallationId, AddonSpec)> {
    expand_libraries(libraries)
        .into_iter()
        .filter_map(|addon| match installations.get(&addon.addon_id) {
            Some((_, InstallationStatus::Installed)) => None,
            Some((installation_id, _)) => Some((*installation_id, addon)),
            None => None,
        })
        .collect()
}

/// Container name for one download; stable so stale ones can be found.
pub fn download_container_name(environment: &str, sgc_id: SgcId, addon_id: AddonId) -> String {
    format!("workshop-download-{environment}-{sgc_id}-{addon_id}")
}

/// The SteamCMD invocation for one workshop item.
pub fn steamcmd_args(install_path: &str, steam_app_id: u32, workshop_id: &str) -> Vec<String> {
    vec![
        "+force_install_dir".to_string(),
        install_path.to_string(),
        "+login".to_string(),
        "anonymous".to_string(),
        "+workshop_download_item".to_string(),
        steam_app_id.to_string(),
        workshop_id.to_string(),
        "+quit".to_string(),
    ]
}

pub struct WorkshopOrchestrator<C: Clock> {
    docker: Arc<dyn ContainerRuntime>,
    publisher: Arc<HostPublisher>,
    config: Arc<HostConfig>,
    clock: C,
    in_flight: Mutex<HashSet<InstallationId>>,
    semaphore: Arc<Semaphore>,
}

impl<C: Clock + 'static> WorkshopOrchestrator<C> {
    pub fn new(
        docker: Arc<dyn ContainerRuntime>,
        publisher: Arc<HostPublisher>,
        config: Arc<HostConfig>,
        clock: C,
    ) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1)));
        Arc::new(Self {
            docker,
            publisher,
            config,
            clock,
            in_flight: Mutex::new(HashSet::new()),
            semaphore,
        })
    }

    /// Consume download commands until cancelled.
    pub fn spawn_run(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<DownloadAddonCommand>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let command = tokio::select! {
                    command = rx.recv() => command,
                    _ = cancel.cancelled() => return,
                };
                let Some(command) = command else { return };

                if !self.in_flight.lock().insert(command.installation_id) {
                    info!(
                        installation_id = %command.installation_id,
                        "download already in flight, dropping duplicate"
                    );
                    continue;
                }

                let orchestrator = Arc::clone(&self);
                tokio::spawn(async move {
                    let installation_id = command.installation_id;
                    orchestrator.download(command).await;
                    orchestrator.in_flight.lock().remove(&installation_id);
                });
            }
        })
    }

    /// Run one download end to end, reporting progress and outcome.
    pub async fn download(&self, command: DownloadAddonCommand) {
        let Ok(_permit) = self.semaphore.acquire().await else {
            return;
        };

        let installation_id = command.installation_id;
        let _ = self
            .publisher
            .installation_status(installation_id, InstallationStatus::Downloading, 0, None)
            .await;

        match self.run_download_container(&command).await {
            Ok(0) => {
                info!(%installation_id, "workshop download finished");
                let _ = self
                    .publisher
                    .installation_status(installation_id, InstallationStatus::Installed, 100, None)
                    .await;
            }
            Ok(code) => {
                warn!(%installation_id, code, "workshop download failed");
                let _ = self
                    .publisher
                    .installation_status(
                        installation_id,
                        InstallationStatus::Failed,
                        0,
                        Some(format!("steamcmd exited with code {code}")),
                    )
                    .await;
            }
            Err(e) => {
                warn!(%installation_id, error = %e, "workshop download errored");
                let _ = self
                    .publisher
                    .installation_status(
                        installation_id,
                        InstallationStatus::Failed,
                        0,
                        Some(e.to_string()),
                    )
                    .await;
            }
        }
    }

    async fn run_download_container(
        &self,
        command: &DownloadAddonCommand,
    ) -> Result<i64, HostError> {
        let name = download_container_name(
            self.config.environment.as_str(),
            command.sgc_id,
            command.addon_id,
        );

        // A crashed earlier attempt may have left a container behind.
        if let Some(stale) = self.docker.find_by_name(&name).await? {
            info!(container_id = %stale, "removing stale download container");
            self.docker.remove_container(&stale, true).await?;
        }

        // SteamCMD runs as uid 1000; pre-create the target world-writable.
        let internal_dir = self.config.internal_path(&command.install_path);
        prepare_install_dir(&internal_dir)?;

        self.docker.pull_image(STEAMCMD_IMAGE).await?;

        let spec = ContainerSpec {
            name: name.clone(),
            image: STEAMCMD_IMAGE.to_string(),
            entrypoint: None,
            cmd: Some(steamcmd_args(
                &command.install_path,
                command.steam_app_id,
                &command.workshop_id,
            )),
            env: HashMap::new(),
            labels: ContainerLabels::workshop(
                self.config.server_id,
                self.config.environment.clone(),
                command.sgc_id,
                (self.clock.epoch_ms() / 1000) as i64,
            ),
            port_bindings: Vec::new(),
            mounts: vec![VolumeMount {
                source: self.config.host_path(&command.install_path),
                target: command.install_path.clone(),
                read_only: false,
            }],
            network: None,
            interactive: false,
        };

        let container_id = self.docker.create_container(&spec).await?;
        self.docker.start_container(&container_id).await?;

        self.stream_progress(&container_id, command.installation_id)
            .await;

        let exit_code = self.docker.wait_container(&container_id).await?;
        self.docker.remove_container(&container_id, true).await?;
        Ok(exit_code)
    }

    /// Follow the container's demultiplexed output, publishing progress
    /// whenever the percentage advances.
    async fn stream_progress(&self, container_id: &str, installation_id: InstallationId) {
        let Ok(handle) = self.docker.attach(container_id).await else {
            return;
        };
        let (mut frames, _stdin) = handle.split();
        let mut assembler = LineAssembler::new();
        let mut last_progress = 0u8;

        while let Some(Ok(frame)) = frames.next().await {
            for (_, line) in assembler.push(&frame) {
                if let Some(progress) = parse_progress(&line) {
                    if progress > last_progress {
                        last_progress = progress;
                        let _ = self
                            .publisher
                            .installation_status(
                                installation_id,
                                InstallationStatus::Downloading,
                                progress,
                                None,
                            )
                            .await;
                    }
                }
            }
        }
    }

    /// Make sure every addon in the SGC's libraries is installed before
    /// a session starts. Skips addons whose installation is already
    /// `installed`, downloads the rest synchronously, and calls the
    /// caller's heartbeat between addons so the host stays visible on
    /// the bus during long materializations.
    pub async fn ensure_library_addons<F, Fut>(
        &self,
        sgc_id: SgcId,
        libraries: &[LibrarySpec],
        installations: &HashMap<AddonId, (InstallationId, InstallationStatus)>,
        heartbeat: F,
    ) -> usize
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ()>,
    {
        for addon in expand_libraries(libraries) {
            if !installations.contains_key(&addon.addon_id) {
                warn!(
                    addon_id = %addon.addon_id,
                    "no installation record for library addon, skipping"
                );
            }
        }

        let plan = plan_downloads(libraries, installations);
        let mut downloaded = 0;
        for (installation_id, addon) in plan {
            heartbeat().await;
            self.download(DownloadAddonCommand {
                installation_id,
                sgc_id,
                addon_id: addon.addon_id,
                workshop_id: addon.workshop_id,
                steam_app_id: addon.steam_app_id,
                install_path: addon.install_path,
            })
            .await;
            downloaded += 1;
        }
        downloaded
    }
}

fn prepare_install_dir(path: &str) -> Result<(), HostError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(path)
        .map_err(|e| HostError::BadCommand(format!("cannot create {path}: {e}")))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))
        .map_err(|e| HostError::BadCommand(format!("cannot chmod {path}: {e}")))?;
    Ok(())
}

#[cfg(test)]
#[path = "workshop_tests.rs"]
mod tests;
