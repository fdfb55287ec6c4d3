// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent broker connection with reconnect.
//!
//! Both daemons hold one [`Bus`] for their lifetime. Channels are cheap
//! and recreated freely; the underlying connection is re-established with
//! exponential backoff whenever it drops, and callers re-declare topology
//! through [`Bus::channel`]'s `on_reconnect` hook.

use crate::error::BusError;
use lapin::{Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

const BACKOFF_INITIAL: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Shared broker connection.
pub struct Bus {
    url: String,
    state: Mutex<Option<Connection>>,
}

impl Bus {
    /// Connect once, eagerly.
    ///
    /// A malformed URL or unreachable broker at startup is fatal for the
    /// caller (configuration error); reconnects later are transparent.
    pub async fn connect(url: &str) -> Result<Arc<Self>, BusError> {
        if !url.starts_with("amqp://") && !url.starts_with("amqps://") {
            return Err(BusError::InvalidUrl(url.to_string()));
        }
        let connection = Connection::connect(url, ConnectionProperties::default()).await?;
        info!("connected to message bus");
        Ok(Arc::new(Self {
            url: url.to_string(),
            state: Mutex::new(Some(connection)),
        }))
    }

    /// Open a fresh channel, reconnecting the underlying connection if it
    /// has dropped. Retries with exponential backoff until it succeeds,
    /// so only call this from tasks that are allowed to wait.
    pub async fn channel(&self) -> Result<Channel, BusError> {
        let mut backoff = BACKOFF_INITIAL;
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(connection) = state.as_ref() {
                    if connection.status().connected() {
                        match connection.create_channel().await {
                            Ok(channel) => return Ok(channel),
                            Err(e) => {
                                warn!(error = %e, "channel creation failed, reconnecting");
                                *state = None;
                            }
                        }
                    } else {
                        *state = None;
                    }
                }

                if state.is_none() {
                    match Connection::connect(&self.url, ConnectionProperties::default()).await {
                        Ok(connection) => {
                            info!("reconnected to message bus");
                            let channel = connection.create_channel().await?;
                            *state = Some(connection);
                            return Ok(channel);
                        }
                        Err(e) => {
                            warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "bus reconnect failed");
                        }
                    }
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(BACKOFF_MAX);
        }
    }

    /// Close the connection; later `channel()` calls would reconnect.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let Some(connection) = state.take() {
            if let Err(e) = connection.close(200, "shutdown").await {
                warn!(error = %e, "bus close failed");
            }
        }
    }
}
