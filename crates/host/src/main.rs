// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hostd` — the ManMan host manager daemon.
//!
//! Runs until SIGINT/SIGTERM. Exit 0 on clean shutdown, non-zero when
//! startup configuration or infrastructure is broken.

use manman_host::{HostConfig, HostDaemon};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match HostConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let daemon = match HostDaemon::start(config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "host manager failed to start");
            std::process::exit(1);
        }
    };

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    daemon.close().await;
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "cannot install SIGTERM handler");
            // Fall back to ctrl-c only.
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
