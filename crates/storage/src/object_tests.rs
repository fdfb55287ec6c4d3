// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn memory_store_round_trips() {
    let store = MemoryObjectStore::new();
    store
        .upload("logs/a.gz", b"data".to_vec(), "text/plain", Some("gzip"))
        .await
        .unwrap();

    assert!(store.exists("logs/a.gz").await.unwrap());
    assert_eq!(store.download("logs/a.gz").await.unwrap(), b"data");

    let object = store.get("logs/a.gz").unwrap();
    assert_eq!(object.content_type, "text/plain");
    assert_eq!(object.content_encoding.as_deref(), Some("gzip"));
}

#[tokio::test]
async fn download_of_missing_key_is_not_found() {
    let store = MemoryObjectStore::new();
    let err = store.download("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::ObjectNotFound(_)));
    assert!(!store.exists("missing").await.unwrap());
}

#[tokio::test]
async fn upload_overwrites_and_delete_removes() {
    let store = MemoryObjectStore::new();
    store
        .upload("k", b"one".to_vec(), "text/plain", None)
        .await
        .unwrap();
    store
        .upload("k", b"two".to_vec(), "text/plain", None)
        .await
        .unwrap();
    assert_eq!(store.download("k").await.unwrap(), b"two");

    store.delete("k").await.unwrap();
    assert!(!store.exists("k").await.unwrap());
}
