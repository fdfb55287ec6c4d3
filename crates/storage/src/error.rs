// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for storage operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("object store error on {key}: {detail}")]
    Object { key: String, detail: String },

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("invalid stored value: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub(crate) fn object(key: &str, detail: impl ToString) -> Self {
        StorageError::Object {
            key: key.to_string(),
            detail: detail.to_string(),
        }
    }
}
