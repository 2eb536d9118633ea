// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-account nonce assignment.
//!
//! One monotonic counter per account behind a single mutex: two
//! concurrent reservations can never hand out the same nonce, and a
//! counter never moves backwards. Chain reads are folded in with
//! `sync`, which only ever advances the counter.

use std::collections::HashMap;

use alloy::primitives::Address;
use tokio::sync::Mutex;

use super::SignerError;

/// Serialized nonce counters for every account this signer touches.
#[derive(Debug, Default)]
pub struct NonceLedger {
    next_by_account: Mutex<HashMap<Address, u64>>,
}

impl NonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in an authoritative pending-nonce read from the chain.
    ///
    /// Never rewinds: a stale read cannot reassign a nonce that a
    /// not-yet-broadcast transaction already holds.
    pub async fn sync(&self, account: Address, chain_next: u64) {
        let mut next_by_account = self.next_by_account.lock().await;
        let next = next_by_account.entry(account).or_insert(0);
        if chain_next > *next {
            tracing::debug!(%account, from = *next, to = chain_next, "nonce synced from chain");
            *next = chain_next;
        }
    }

    /// Reserve the next unused nonce for `account`.
    pub async fn reserve_next(&self, account: Address) -> u64 {
        let mut next_by_account = self.next_by_account.lock().await;
        let next = next_by_account.entry(account).or_insert(0);
        let assigned = *next;
        *next += 1;
        assigned
    }

    /// Reserve a specific nonce, advancing the counter past it.
    ///
    /// Fails with [`SignerError::NonceConflict`] if `nonce` was already
    /// assigned.
    pub async fn reserve_exact(&self, account: Address, nonce: u64) -> Result<u64, SignerError> {
        let mut next_by_account = self.next_by_account.lock().await;
        let next = next_by_account.entry(account).or_insert(0);
        if nonce < *next {
            return Err(SignerError::NonceConflict { nonce });
        }
        *next = nonce + 1;
        Ok(nonce)
    }

    /// The next nonce that would be assigned, without reserving it.
    pub async fn peek_next(&self, account: Address) -> u64 {
        let next_by_account = self.next_by_account.lock().await;
        next_by_account.get(&account).copied().unwrap_or(0)
    }
}
