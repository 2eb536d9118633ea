// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory seed custody and account derivation.
//!
//! ## Handle Model
//!
//! [`KeyManager::open`] moves an unlocked seed into a [`WalletHandle`],
//! the only long-lived reference to key material. Accounts derived from
//! the handle share the same seed slot: closing the wallet zeroes the
//! seed and every outstanding [`AccountHandle`] starts failing with
//! [`KeyError::HandleClosed`].
//!
//! Signing re-derives the private key under the wallet lock on each call
//! and zeroes it before returning, so no raw key bytes outlive a single
//! operation and no API ever returns them.

use std::sync::Arc;

use alloy::primitives::{Address, B256, Signature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use bip32::{DerivationPath, XPrv};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tokio::sync::Mutex;
use zeroize::Zeroize;

use crate::config;

use super::seed::Seed;
use super::KeyError;

/// Factory for wallet handles. Hosts construct one and inject it wherever
/// signing capability is needed.
#[derive(Debug, Default, Clone)]
pub struct KeyManager;

impl KeyManager {
    pub fn new() -> Self {
        Self
    }

    /// Take custody of an unlocked seed.
    pub fn open(&self, seed: Seed) -> WalletHandle {
        tracing::debug!("wallet handle opened");
        WalletHandle {
            slot: Arc::new(Mutex::new(Some(seed))),
        }
    }

    /// Derive the account at `path` (e.g. `m/44'/60'/0'/0/0`).
    ///
    /// Deterministic: the same seed and path always yield the same
    /// address, on this install or any other.
    pub async fn derive_account(
        &self,
        handle: &WalletHandle,
        path: &str,
    ) -> Result<AccountHandle, KeyError> {
        let path_str = path.to_string();
        let path: DerivationPath = path
            .parse()
            .map_err(|_| KeyError::InvalidPath(path_str.clone()))?;

        let slot = handle.slot.lock().await;
        let seed = slot.as_ref().ok_or(KeyError::HandleClosed)?;
        let signer = derive_signer(seed, &path)?;

        let address = signer.address();
        let public_key = signer
            .credential()
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        drop(slot);

        tracing::debug!(%address, "account derived");
        Ok(AccountHandle {
            slot: Arc::clone(&handle.slot),
            path,
            path_str,
            address,
            public_key,
        })
    }

    /// Derive the primary account at the default BIP-44 path.
    pub async fn derive_default_account(
        &self,
        handle: &WalletHandle,
    ) -> Result<AccountHandle, KeyError> {
        self.derive_account(handle, config::DEFAULT_DERIVATION_PATH)
            .await
    }

    /// Zero and discard the seed. Call on logout or app backgrounding.
    ///
    /// Idempotent; every account derived from the handle fails afterwards.
    pub async fn close(&self, handle: &WalletHandle) {
        let mut slot = handle.slot.lock().await;
        if slot.take().is_some() {
            // Seed's drop impl zeroes the buffer
            tracing::info!("wallet handle closed, seed zeroed");
        }
    }
}

/// Cloneable reference to an open wallet's seed slot.
#[derive(Clone)]
pub struct WalletHandle {
    slot: Arc<Mutex<Option<Seed>>>,
}

impl WalletHandle {
    /// Whether the wallet has been closed.
    pub async fn is_closed(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}

impl std::fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletHandle").finish_non_exhaustive()
    }
}

/// Opaque signing capability for one derived account.
#[derive(Clone)]
pub struct AccountHandle {
    slot: Arc<Mutex<Option<Seed>>>,
    path: DerivationPath,
    path_str: String,
    address: Address,
    public_key: Vec<u8>,
}

impl AccountHandle {
    /// Account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// EIP-55 checksummed address string.
    pub fn checksum_address(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Compressed SEC1 public key, hex-encoded.
    pub fn public_key_hex(&self) -> String {
        alloy::hex::encode(&self.public_key)
    }

    /// Derivation path this account was created at.
    pub fn derivation_path(&self) -> &str {
        &self.path_str
    }

    /// Sign a 32-byte digest with this account's key.
    ///
    /// RFC 6979 deterministic ECDSA: the same digest always produces the
    /// same signature. Fails with [`KeyError::HandleClosed`] once the
    /// owning wallet is closed, including mid-flight.
    pub async fn sign_digest(&self, digest: B256) -> Result<Signature, KeyError> {
        let slot = self.slot.lock().await;
        let seed = slot.as_ref().ok_or(KeyError::HandleClosed)?;
        let signer = derive_signer(seed, &self.path)?;

        signer
            .sign_hash_sync(&digest)
            .map_err(|e| KeyError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for AccountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountHandle")
            .field("address", &self.address)
            .field("path", &self.path_str)
            .finish_non_exhaustive()
    }
}

/// Derive the signer for `path`, zeroing intermediate key bytes.
fn derive_signer(seed: &Seed, path: &DerivationPath) -> Result<PrivateKeySigner, KeyError> {
    let xprv = XPrv::derive_from_path(seed.as_bytes(), path)
        .map_err(|e| KeyError::Derivation(e.to_string()))?;

    let mut key_bytes: [u8; 32] = xprv.private_key().to_bytes().into();
    let signer = PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| KeyError::Derivation(e.to_string()));
    key_bytes.zeroize();
    signer
}
