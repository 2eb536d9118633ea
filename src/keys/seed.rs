// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet seed: the root secret every key derives from.
//!
//! A [`Seed`] exists in plaintext only in volatile memory and zeroes its
//! buffer on drop. It is never logged, never serialized, and never crosses
//! the crate boundary except as the return value of a vault unlock headed
//! straight into [`KeyManager::open`].
//!
//! [`KeyManager::open`]: crate::keys::KeyManager::open

use bip39::{Language, Mnemonic};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::KeyError;

/// Minimum raw-entropy seed length in bytes (BIP-32 lower bound).
pub const MIN_SEED_LEN: usize = 16;

/// Maximum raw-entropy seed length in bytes (BIP-32 upper bound).
pub const MAX_SEED_LEN: usize = 64;

/// High-entropy root secret. Zeroed on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: Vec<u8>,
}

impl Seed {
    /// Generate a fresh seed from a new 12-word mnemonic.
    ///
    /// Returns the seed together with the phrase for one-time display to
    /// the user; the phrase is not retained anywhere in the core.
    pub fn generate() -> Result<(Self, Zeroizing<String>), KeyError> {
        let mnemonic = Mnemonic::generate_in(Language::English, 12)
            .map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;
        let phrase = Zeroizing::new(mnemonic.to_string());
        let seed = Self {
            bytes: mnemonic.to_seed("").to_vec(),
        };
        Ok((seed, phrase))
    }

    /// Re-import a seed from a BIP-39 phrase (checksum-validated).
    ///
    /// The same phrase and passphrase always reproduce the same seed,
    /// which is what keeps account addresses stable across reinstalls.
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self, KeyError> {
        let mnemonic =
            Mnemonic::parse(phrase).map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;
        Ok(Self {
            bytes: mnemonic.to_seed(passphrase).to_vec(),
        })
    }

    /// Wrap raw entropy bytes (16–64 bytes) as a seed.
    pub fn from_entropy(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SEED_LEN || bytes.len() > MAX_SEED_LEN {
            return Err(KeyError::InvalidSeedLength { len: bytes.len() });
        }
        Ok(Self { bytes })
    }

    /// Raw seed bytes. Crate-internal: only the vault (encryption) and the
    /// key manager (derivation) may see them.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Seed {}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print seed material
        write!(f, "Seed(<{} bytes redacted>)", self.bytes.len())
    }
}
