// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Envelope persistence.
//!
//! One envelope record per wallet, keyed `envelope/{wallet_id}`. The
//! create/replace split is what makes secret rotation safe: `replace`
//! refuses to run before a first envelope exists, and the underlying
//! store swaps values atomically, so the old envelope stays decryptable
//! until the new one is durable.

use crate::storage::kv::{KeyValueStore, StoreError, StoreResult};
use crate::vault::EncryptedSeedEnvelope;

fn envelope_key(wallet_id: &str) -> String {
    format!("envelope/{wallet_id}")
}

/// Repository for seed envelopes on an injected key-value store.
pub struct EnvelopeRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> EnvelopeRepository<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Check if a wallet has a persisted envelope.
    pub fn exists(&self, wallet_id: &str) -> StoreResult<bool> {
        self.store.contains(&envelope_key(wallet_id))
    }

    /// Load the envelope for a wallet.
    pub fn get(&self, wallet_id: &str) -> StoreResult<EncryptedSeedEnvelope> {
        let bytes = self
            .store
            .get(&envelope_key(wallet_id))?
            .ok_or_else(|| StoreError::NotFound(format!("envelope for {wallet_id}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist a first envelope for a wallet.
    pub fn create(
        &self,
        wallet_id: &str,
        envelope: &EncryptedSeedEnvelope,
    ) -> StoreResult<()> {
        if self.exists(wallet_id)? {
            return Err(StoreError::AlreadyExists(format!("envelope for {wallet_id}")));
        }
        self.write(wallet_id, envelope)
    }

    /// Replace an existing envelope (secret rotation, KDF upgrade).
    pub fn replace(
        &self,
        wallet_id: &str,
        envelope: &EncryptedSeedEnvelope,
    ) -> StoreResult<()> {
        if !self.exists(wallet_id)? {
            return Err(StoreError::NotFound(format!("envelope for {wallet_id}")));
        }
        self.write(wallet_id, envelope)
    }

    /// Remove a wallet's envelope (wallet deletion).
    pub fn delete(&self, wallet_id: &str) -> StoreResult<()> {
        self.store.delete(&envelope_key(wallet_id))
    }

    fn write(&self, wallet_id: &str, envelope: &EncryptedSeedEnvelope) -> StoreResult<()> {
        let bytes = serde_json::to_vec(envelope)?;
        self.store.set(&envelope_key(wallet_id), &bytes)?;
        tracing::debug!(wallet_id, version = envelope.version, "envelope persisted");
        Ok(())
    }
}
