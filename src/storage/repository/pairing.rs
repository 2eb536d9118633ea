// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pairing-session bookkeeping.
//!
//! Sessions are short-lived by construction, so the repository carries a
//! sweep that drops finished sessions and everything past its TTL; hosts
//! run it opportunistically (e.g. on app foreground) rather than on a
//! timer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::pairing::{PairingSession, PairingStatus};
use crate::storage::kv::{KeyValueStore, StoreError, StoreResult};

const SESSION_PREFIX: &str = "pairing/";

fn session_key(session_id: &Uuid) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// Repository for pairing sessions on an injected key-value store.
pub struct PairingRepository<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> PairingRepository<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Persist a session (insert or update).
    pub fn save(&self, session: &PairingSession) -> StoreResult<()> {
        let bytes = serde_json::to_vec(session)?;
        self.store.set(&session_key(&session.session_id), &bytes)
    }

    /// Load a session by id.
    pub fn get(&self, session_id: &Uuid) -> StoreResult<PairingSession> {
        let bytes = self
            .store
            .get(&session_key(session_id))?
            .ok_or_else(|| StoreError::NotFound(format!("pairing session {session_id}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Remove a session.
    pub fn delete(&self, session_id: &Uuid) -> StoreResult<()> {
        self.store.delete(&session_key(session_id))
    }

    /// List ids of all stored sessions.
    pub fn list_ids(&self) -> StoreResult<Vec<Uuid>> {
        let keys = self.store.list_keys(SESSION_PREFIX)?;
        Ok(keys
            .iter()
            .filter_map(|k| k.strip_prefix(SESSION_PREFIX))
            .filter_map(|id| id.parse().ok())
            .collect())
    }

    /// Drop every finished session: `Bound`, `Expired`, or one whose TTL
    /// elapsed before verification. A session record lives exactly as
    /// long as the handshake it tracks.
    ///
    /// Returns the number of sessions removed.
    pub fn purge_finished(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut purged = 0;
        for session_id in self.list_ids()? {
            let session = match self.get(&session_id) {
                Ok(session) => session,
                // Concurrently removed; nothing to purge
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            let dead = matches!(
                session.status,
                PairingStatus::Bound | PairingStatus::Expired
            ) || (matches!(
                session.status,
                PairingStatus::Pending | PairingStatus::Challenged
            ) && session.is_expired_at(now));

            if dead {
                self.delete(&session_id)?;
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::debug!(purged, "finished pairing sessions removed");
        }
        Ok(purged)
    }
}
