// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object store client.
//!
//! S3-compatible with a configurable endpoint (MinIO and friends use
//! path-style addressing). Credentials come from the standard provider
//! chain; nothing here reads secrets itself.

use crate::error::StorageError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;

/// Operations the archiver needs from the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        content_encoding: Option<&str>,
    ) -> Result<(), StorageError>;

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores; None means real AWS.
    pub endpoint: Option<String>,
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub async fn new(config: S3Config) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        content_encoding: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes));
        if let Some(encoding) = content_encoding {
            request = request.content_encoding(encoding);
        }
        request
            .send()
            .await
            .map_err(|e| StorageError::object(key, e))?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::ObjectNotFound(key.to_string())
                } else {
                    StorageError::object(key, service_error)
                }
            })?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::object(key, e))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::object(key, service_error))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::object(key, e))?;
        Ok(())
    }
}

/// One object held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_encoding: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryObjectStore;

#[cfg(any(test, feature = "test-support"))]
mod memory {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Map-backed store for tests.
    #[derive(Default)]
    pub struct MemoryObjectStore {
        objects: Mutex<HashMap<String, StoredObject>>,
    }

    impl MemoryObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get(&self, key: &str) -> Option<StoredObject> {
            self.objects.lock().get(key).cloned()
        }

        pub fn keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().keys().cloned().collect();
            keys.sort();
            keys
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryObjectStore {
        async fn upload(
            &self,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
            content_encoding: Option<&str>,
        ) -> Result<(), StorageError> {
            self.objects.lock().insert(
                key.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.to_string(),
                    content_encoding: content_encoding.map(str::to_string),
                },
            );
            Ok(())
        }

        async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
            self.objects
                .lock()
                .get(key)
                .map(|o| o.bytes.clone())
                .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
        }

        async fn exists(&self, key: &str) -> Result<bool, StorageError> {
            Ok(self.objects.lock().contains_key(key))
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.objects.lock().remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
