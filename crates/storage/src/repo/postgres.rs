// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres implementations of the repository traits.
//!
//! Queries are runtime-bound (no compile-time schema coupling); the
//! schema itself is owned by the external migration runner.

use crate::error::StorageError;
use crate::records::{LogReferenceRecord, LogReferenceState};
use crate::repo::{LogReferenceStore, ProjectionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use manman_core::{
    HostStatus, InstallationId, InstallationStatus, ServerId, SessionId, SessionStatus,
    SessionStatusUpdate, SgcId,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::warn;

/// Shared Postgres pool implementing both repository traits.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect eagerly; an unreachable database is startup-fatal.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProjectionStore for PgStore {
    async fn update_server_status(
        &self,
        server_id: ServerId,
        status: HostStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            "UPDATE servers SET status = $2, last_seen = $3 WHERE id = $1",
        )
        .bind(server_id.as_i64())
        .bind(status.as_str())
        .bind(seen_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            // Host self-registration happens out of band; a status for an
            // unknown server is dropped, not an error.
            warn!(%server_id, %status, "status update for unknown server");
        }
        Ok(())
    }

    async fn record_heartbeat(
        &self,
        server_id: ServerId,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE servers SET last_seen = $2, \
             status = CASE WHEN status = 'offline' THEN 'online' ELSE status END \
             WHERE id = $1",
        )
        .bind(server_id.as_i64())
        .bind(seen_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_server_offline(&self, server_id: ServerId) -> Result<(), StorageError> {
        sqlx::query("UPDATE servers SET status = 'offline' WHERE id = $1")
            .bind(server_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ensure_server_capability(&self, server_id: ServerId) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO server_capabilities (server_id) VALUES ($1) \
             ON CONFLICT (server_id) DO NOTHING",
        )
        .bind(server_id.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn session_status(
        &self,
        session_id: SessionId,
    ) -> Result<Option<SessionStatus>, StorageError> {
        let row = sqlx::query("SELECT status FROM sessions WHERE id = $1")
            .bind(session_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let status: String = row.try_get("status")?;
                let status = status
                    .parse::<SessionStatus>()
                    .map_err(StorageError::Corrupt)?;
                Ok(Some(status))
            }
            None => Ok(None),
        }
    }

    async fn apply_session_update(
        &self,
        update: &SessionStatusUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let terminal = update.status.is_terminal();
        sqlx::query(
            "INSERT INTO sessions (id, sgc_id, status, started_at, ended_at, exit_code) \
             VALUES ($1, $2, $3, \
                     CASE WHEN $3 = 'running' THEN $4 END, \
                     CASE WHEN $5 THEN $4 END, \
                     CASE WHEN $5 THEN $6 END) \
             ON CONFLICT (id) DO UPDATE SET \
               status = EXCLUDED.status, \
               started_at = CASE WHEN EXCLUDED.status = 'running' AND sessions.started_at IS NULL \
                                 THEN $4 ELSE sessions.started_at END, \
               ended_at = CASE WHEN $5 THEN $4 ELSE sessions.ended_at END, \
               exit_code = CASE WHEN $5 THEN $6 ELSE sessions.exit_code END",
        )
        .bind(update.session_id.as_i64())
        .bind(update.sgc_id.as_i64())
        .bind(update.status.as_str())
        .bind(at)
        .bind(terminal)
        .bind(update.exit_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stale_online_servers(
        &self,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<ServerId>, StorageError> {
        let cutoff = now
            - chrono::Duration::from_std(threshold)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?;
        let rows = sqlx::query(
            "SELECT id FROM servers WHERE status = 'online' AND last_seen < $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Ok(ServerId::new(row.try_get::<i64, _>("id")?)))
            .collect()
    }

    async fn live_sessions_for_server(
        &self,
        server_id: ServerId,
    ) -> Result<Vec<(SessionId, SgcId)>, StorageError> {
        let rows = sqlx::query(
            "SELECT s.id, s.sgc_id FROM sessions s \
             JOIN server_game_configs c ON c.id = s.sgc_id \
             WHERE c.server_id = $1 \
               AND s.status IN ('pending', 'starting', 'running', 'stopping')",
        )
        .bind(server_id.as_i64())
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    SessionId::new(row.try_get::<i64, _>("id")?),
                    SgcId::new(row.try_get::<i64, _>("sgc_id")?),
                ))
            })
            .collect()
    }

    async fn update_installation(
        &self,
        installation_id: InstallationId,
        status: InstallationStatus,
        progress_percent: u8,
        error_message: Option<&str>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE workshop_installations \
             SET status = $2, progress_percent = $3, error_message = $4 \
             WHERE id = $1",
        )
        .bind(installation_id.as_i64())
        .bind(status.as_str())
        .bind(progress_percent as i32)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<LogReferenceRecord, StorageError> {
    let state: String = row.try_get("state")?;
    Ok(LogReferenceRecord {
        sgc_id: SgcId::new(row.try_get::<i64, _>("sgc_id")?),
        session_id: SessionId::new(row.try_get::<i64, _>("session_id")?),
        object_key: row.try_get("object_key")?,
        first_log_at: row.try_get("first_log_at")?,
        last_log_at: row.try_get("last_log_at")?,
        line_count: row.try_get("line_count")?,
        source: row.try_get("source")?,
        minute_ts: row.try_get("minute_ts")?,
        state: state
            .parse::<LogReferenceState>()
            .map_err(StorageError::Corrupt)?,
        created_at: row.try_get("created_at")?,
        appended_at: row.try_get("appended_at")?,
    })
}

#[async_trait]
impl LogReferenceStore for PgStore {
    async fn get(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
    ) -> Result<Option<LogReferenceRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT sgc_id, session_id, object_key, first_log_at, last_log_at, line_count, \
                    source, minute_ts, state, created_at, appended_at \
             FROM log_references WHERE sgc_id = $1 AND minute_ts = $2",
        )
        .bind(sgc_id.as_i64())
        .bind(minute_ts)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert_pending(&self, record: &LogReferenceRecord) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT INTO log_references \
               (sgc_id, session_id, object_key, first_log_at, last_log_at, line_count, \
                source, minute_ts, state, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9) \
             ON CONFLICT (sgc_id, minute_ts) DO NOTHING",
        )
        .bind(record.sgc_id.as_i64())
        .bind(record.session_id.as_i64())
        .bind(&record.object_key)
        .bind(record.first_log_at)
        .bind(record.last_log_at)
        .bind(record.line_count)
        .bind(&record.source)
        .bind(record.minute_ts)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_complete(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE log_references SET state = 'complete' \
             WHERE sgc_id = $1 AND minute_ts = $2",
        )
        .bind(sgc_id.as_i64())
        .bind(minute_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_appended(
        &self,
        sgc_id: SgcId,
        minute_ts: DateTime<Utc>,
        added_lines: i64,
        last_log_at: DateTime<Utc>,
        appended_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "UPDATE log_references \
             SET line_count = line_count + $3, last_log_at = $4, appended_at = $5, \
                 state = 'complete' \
             WHERE sgc_id = $1 AND minute_ts = $2",
        )
        .bind(sgc_id.as_i64())
        .bind(minute_ts)
        .bind(added_lines)
        .bind(last_log_at)
        .bind(appended_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
