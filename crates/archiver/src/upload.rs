// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Window upload: gzip, first-write vs append, replica protection.
//!
//! Object stores have no primitive append, so appending re-writes the
//! whole object: download, gunzip, splice in a separator plus the new
//! bytes, re-gzip, PUT. One object per minute keeps the read side (log
//! viewers) trivial, which is worth the rewrite cost at this volume.

use crate::archiver::ArchiverError;
use crate::window::MinuteWindow;
use chrono::{DateTime, Datelike, Timelike, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use manman_storage::{
    LogReferenceRecord, LogReferenceState, LogReferenceStore, ObjectStore,
};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{info, warn};

/// Object key for one minute window. Lexicographic order is time order.
pub fn object_key(window: &MinuteWindow) -> String {
    let minute = window.key.minute_ts;
    format!(
        "logs/sgc-{}/session-{}/{:04}/{:02}/{:02}/{:02}/{:02}.log.gz",
        window.key.sgc_id,
        window.key.session_id,
        minute.year(),
        minute.month(),
        minute.day(),
        minute.hour(),
        minute.minute(),
    )
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn append_separator(now: DateTime<Utc>) -> String {
    format!("\n--- APPENDED AT {} ---\n", now.to_rfc3339())
}

/// What the upload did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// New object created.
    Created,
    /// Existing object rewritten with the new bytes appended.
    Appended,
    /// Another worker holds a young pending row; nothing uploaded.
    Skipped,
}

/// Upload one closed window.
///
/// The pending-row check is the coarse cross-replica mutex: a `pending`
/// LogReference younger than `protection_window` means another worker is
/// mid-upload, so this one backs off. Two workers starting inside the
/// window can still race; the append path makes that safe (worst case is
/// a duplicated separator line), so the race is documented rather than
/// closed.
pub async fn upload_window(
    window: &MinuteWindow,
    store: &dyn ObjectStore,
    log_refs: &dyn LogReferenceStore,
    now: DateTime<Utc>,
    protection_window: Duration,
) -> Result<UploadOutcome, ArchiverError> {
    let key = object_key(window);
    let sgc_id = window.key.sgc_id;
    let minute_ts = window.key.minute_ts;

    if let Some(existing) = log_refs.get(sgc_id, minute_ts).await? {
        let age = now.signed_duration_since(existing.created_at);
        let protection = chrono::Duration::from_std(protection_window).unwrap_or_default();
        if existing.state == LogReferenceState::Pending && age < protection {
            warn!(
                key,
                age_ms = age.num_milliseconds(),
                "pending log reference is young, presuming another worker owns it"
            );
            return Ok(UploadOutcome::Skipped);
        }
    }

    let content = window.content();

    if !store.exists(&key).await? {
        let compressed = gzip(content.as_bytes())?;
        let record = LogReferenceRecord {
            sgc_id,
            session_id: window.key.session_id,
            object_key: key.clone(),
            first_log_at: window.first_log_at,
            last_log_at: window.last_log_at,
            line_count: window.line_count() as i64,
            source: window.source.as_str().to_string(),
            minute_ts,
            state: LogReferenceState::Pending,
            created_at: now,
            appended_at: None,
        };
        // A lost insert race just means we append on a later pass; the
        // upload itself proceeds either way.
        log_refs.insert_pending(&record).await?;

        let raw_len = content.len();
        let compressed_len = compressed.len();
        store
            .upload(&key, compressed, "text/plain", Some("gzip"))
            .await?;
        log_refs.mark_complete(sgc_id, minute_ts).await?;

        // Tiny windows can grow under gzip's fixed header; report 0%
        // rather than underflowing.
        let reduction = raw_len
            .checked_sub(compressed_len)
            .map(|saved| saved * 100 / raw_len.max(1))
            .unwrap_or(0);
        info!(
            key,
            "compressed {raw_len} → {compressed_len} bytes ({reduction}% reduction)"
        );
        Ok(UploadOutcome::Created)
    } else {
        let existing_bytes = store.download(&key).await?;
        let mut combined = gunzip(&existing_bytes)?;
        combined.extend_from_slice(append_separator(now).as_bytes());
        combined.extend_from_slice(content.as_bytes());

        let compressed = gzip(&combined)?;
        store
            .upload(&key, compressed, "text/plain", Some("gzip"))
            .await?;
        log_refs
            .mark_appended(
                sgc_id,
                minute_ts,
                window.line_count() as i64,
                window.last_log_at,
                now,
            )
            .await?;
        info!(key, lines = window.line_count(), "appended to existing log object");
        Ok(UploadOutcome::Appended)
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
