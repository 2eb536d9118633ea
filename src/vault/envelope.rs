// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted seed-envelope format.
//!
//! ## Record Layout
//!
//! ```text
//! {
//!   "version": 1,
//!   "kdf": { "m_cost": ..., "t_cost": ..., "p_cost": ..., "output_len": ... },
//!   "salt": [..16 bytes..],
//!   "iv": [..12 bytes..],
//!   "cipher_text": [...]
//! }
//! ```
//!
//! Readers dispatch on `version`; an unrecognized version is structural
//! corruption, not a decryption failure. `rotate_secret` re-encrypts at
//! the current version, which is how KDF/cipher upgrades roll out without
//! breaking old envelopes.

use serde::{Deserialize, Serialize};

use crate::config;

/// Argon2id parameters, serialized alongside the ciphertext so unlock
/// re-derives with exactly what the envelope was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Time cost (passes)
    pub t_cost: u32,
    /// Parallelism (lanes)
    pub p_cost: u32,
    /// Derived-key length in bytes
    pub output_len: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: config::KDF_M_COST,
            t_cost: config::KDF_T_COST,
            p_cost: config::KDF_P_COST,
            output_len: config::KDF_OUTPUT_LEN,
        }
    }
}

/// Encrypted seed at rest.
///
/// Decryptable only with the unlock secret it was created under; the GCM
/// tag makes any bit-flip in `cipher_text`, `salt`, or `iv` fail
/// decryption. The struct itself carries no plaintext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedSeedEnvelope {
    /// Format version (see module docs)
    pub version: u32,
    /// KDF parameters used for this envelope
    pub kdf: KdfParams,
    /// Per-envelope random salt
    pub salt: Vec<u8>,
    /// AES-GCM nonce, random per encryption
    pub iv: Vec<u8>,
    /// AES-256-GCM ciphertext (includes the auth tag)
    pub cipher_text: Vec<u8>,
}

impl EncryptedSeedEnvelope {
    /// Structural validity check, performed before any key derivation.
    ///
    /// Returns `false` for unknown versions or malformed salt/IV lengths.
    /// Tag verification (tamper detection) happens during decryption.
    pub fn is_well_formed(&self) -> bool {
        self.version == config::ENVELOPE_VERSION
            && self.salt.len() == config::SALT_LEN
            && self.iv.len() == config::IV_LEN
            && !self.cipher_text.is_empty()
            && self.kdf.output_len == config::KDF_OUTPUT_LEN
            && self.kdf.m_cost > 0
            && self.kdf.t_cost > 0
            && self.kdf.p_cost > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_envelope() -> EncryptedSeedEnvelope {
        EncryptedSeedEnvelope {
            version: config::ENVELOPE_VERSION,
            kdf: KdfParams::default(),
            salt: vec![1u8; config::SALT_LEN],
            iv: vec![2u8; config::IV_LEN],
            cipher_text: vec![3u8; 48],
        }
    }

    #[test]
    fn default_params_match_config() {
        let params = KdfParams::default();
        assert_eq!(params.m_cost, config::KDF_M_COST);
        assert_eq!(params.output_len, 32);
    }

    #[test]
    fn well_formed_envelope_passes() {
        assert!(sample_envelope().is_well_formed());
    }

    #[test]
    fn unknown_version_is_malformed() {
        let mut envelope = sample_envelope();
        envelope.version = 99;
        assert!(!envelope.is_well_formed());
    }

    #[test]
    fn wrong_salt_length_is_malformed() {
        let mut envelope = sample_envelope();
        envelope.salt = vec![1u8; 4];
        assert!(!envelope.is_well_formed());
    }

    #[test]
    fn wrong_iv_length_is_malformed() {
        let mut envelope = sample_envelope();
        envelope.iv = vec![2u8; 16];
        assert!(!envelope.is_well_formed());
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let envelope = sample_envelope();
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EncryptedSeedEnvelope = serde_json::from_str(&json).unwrap();

        assert_eq!(back.version, envelope.version);
        assert_eq!(back.kdf, envelope.kdf);
        assert_eq!(back.salt, envelope.salt);
        assert_eq!(back.iv, envelope.iv);
        assert_eq!(back.cipher_text, envelope.cipher_text);
    }
}
