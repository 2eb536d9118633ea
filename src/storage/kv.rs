// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key-value persistence boundary.
//!
//! The core never talks to a concrete store directly; hosts inject an
//! implementation of [`KeyValueStore`] (no process-wide singleton). Values
//! are opaque byte blobs; all schema lives in the repositories layered on
//! top.

use std::collections::HashMap;
use std::sync::Mutex;

/// Error type for persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Opaque byte-blob store the host injects into the core.
///
/// Implementations must make `set` atomic: a concurrent reader observes
/// either the previous value or the new one, never a partial write.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value for `key`, or `None` if absent.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Check whether `key` is present.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// List all keys with the given prefix.
    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_value() {
        let store = MemoryStore::new();
        store.set("a", b"hello").unwrap();

        assert_eq!(store.get("a").unwrap(), Some(b"hello".to_vec()));
        assert!(store.contains("a").unwrap());
    }

    #[test]
    fn get_missing_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
        assert!(!store.contains("missing").unwrap());
    }

    #[test]
    fn set_replaces_previous_value() {
        let store = MemoryStore::new();
        store.set("a", b"one").unwrap();
        store.set("a", b"two").unwrap();

        assert_eq!(store.get("a").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn delete_removes_key() {
        let store = MemoryStore::new();
        store.set("a", b"x").unwrap();
        store.delete("a").unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        // Deleting again is a no-op
        store.delete("a").unwrap();
    }

    #[test]
    fn list_keys_filters_by_prefix() {
        let store = MemoryStore::new();
        store.set("pairing/1", b"x").unwrap();
        store.set("pairing/2", b"y").unwrap();
        store.set("envelope/main", b"z").unwrap();

        let keys = store.list_keys("pairing/").unwrap();
        assert_eq!(keys, vec!["pairing/1".to_string(), "pairing/2".to_string()]);
    }
}
