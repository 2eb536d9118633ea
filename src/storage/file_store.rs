// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed key-value store with atomic replacement.
//!
//! One file per key under a root directory. Writes go to a temp file first
//! and are then renamed over the target, so a reader never observes a
//! partially written value. Slashes in keys map to subdirectories, which
//! keeps the on-disk layout browsable (`envelope/main`, `pairing/{id}`).

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::kv::{KeyValueStore, StoreResult};

/// Durable store writing one file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        // Open instead of stat: some encrypted filesystems fail stat()
        // on files that open() + read() handle fine.
        let mut file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        // Prefixes are expected to name a directory (e.g. "pairing/").
        let dir = self.path_for(prefix.trim_end_matches('/'));
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    if !name.ends_with(".tmp") {
                        keys.push(format!("{}{}", prefix, name));
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set("envelope/main", b"payload").unwrap();
        assert_eq!(store.get("envelope/main").unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn get_missing_returns_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn set_replaces_atomically() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set("k", b"old").unwrap();
        store.set("k", b"new").unwrap();

        assert_eq!(store.get("k").unwrap(), Some(b"new".to_vec()));
        // No temp file left behind
        assert_eq!(store.get("k.tmp").unwrap(), None);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set("k", b"v").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();

        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn list_keys_returns_prefixed_entries() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set("pairing/aa", b"1").unwrap();
        store.set("pairing/bb", b"2").unwrap();
        store.set("envelope/main", b"3").unwrap();

        let keys = store.list_keys("pairing/").unwrap();
        assert_eq!(keys, vec!["pairing/aa".to_string(), "pairing/bb".to_string()]);
    }
}
