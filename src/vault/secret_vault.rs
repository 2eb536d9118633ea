// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seed envelope encryption and unlock.
//!
//! ## Failure Discipline
//!
//! A wrong unlock secret and a tampered ciphertext both fail inside the
//! same AEAD open and both surface as [`VaultError::InvalidSecret`]; an
//! attacker cannot tell the cases apart from the error, the message, or
//! the code path. [`VaultError::CorruptEnvelope`] is reserved for
//! structural invalidity (unknown version, malformed salt/IV) detected
//! before any key derivation. `user_message` renders both identically.
//!
//! KDF work runs on the blocking pool under a timeout so a hostile or
//! degraded host cannot hang the caller indefinitely.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use std::time::Duration;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, Zeroizing};

use crate::config;
use crate::keys::Seed;

use super::envelope::{EncryptedSeedEnvelope, KdfParams};

/// Vault error type.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// Unlock secret fails the minimum-entropy policy.
    #[error("unlock secret is too weak: {0}")]
    WeakSecret(&'static str),

    /// Decryption failed: wrong secret or tampered envelope.
    #[error("cannot unlock envelope")]
    InvalidSecret,

    /// Envelope is structurally invalid.
    #[error("envelope is corrupt")]
    CorruptEnvelope,

    /// KDF computation exceeded the configured bound.
    #[error("vault operation timed out")]
    Timeout,

    /// KDF parameter or internal failure.
    #[error("key derivation failed: {0}")]
    Kdf(String),
}

impl VaultError {
    /// User-facing message for this error.
    ///
    /// `InvalidSecret` and `CorruptEnvelope` intentionally share one
    /// generic message so the UI cannot leak which failure occurred.
    pub fn user_message(&self) -> &'static str {
        match self {
            VaultError::InvalidSecret | VaultError::CorruptEnvelope => "Unable to unlock wallet.",
            VaultError::WeakSecret(_) => "Choose a longer or more varied unlock secret.",
            VaultError::Timeout => "Unlocking took too long. Try again.",
            VaultError::Kdf(_) => "Wallet error. Try again.",
        }
    }
}

/// Envelope encryption of the wallet seed under a user-derived key.
///
/// Pure with respect to persistence: `create` and `rotate_secret` return
/// envelopes; durably storing them (and replacing old ones only after the
/// new one is written) is the caller's job via the storage repositories.
#[derive(Debug, Clone)]
pub struct SecretVault {
    kdf_params: KdfParams,
    kdf_timeout: Duration,
}

impl Default for SecretVault {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretVault {
    /// Vault with the standard Argon2id parameters and timeout.
    pub fn new() -> Self {
        Self {
            kdf_params: KdfParams::default(),
            kdf_timeout: Duration::from_secs(config::KDF_TIMEOUT_SECS),
        }
    }

    /// Override KDF parameters for new envelopes (tests, low-end devices).
    pub fn with_kdf_params(params: KdfParams) -> Self {
        Self {
            kdf_params: params,
            kdf_timeout: Duration::from_secs(config::KDF_TIMEOUT_SECS),
        }
    }

    /// Override the KDF timeout bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.kdf_timeout = timeout;
        self
    }

    /// Encrypt `seed` under `unlock_secret` into a fresh envelope.
    ///
    /// Fresh random salt and IV every call; the same seed and secret
    /// never produce the same ciphertext twice.
    pub async fn create(
        &self,
        seed: &Seed,
        unlock_secret: &str,
    ) -> Result<EncryptedSeedEnvelope, VaultError> {
        let secret = normalize_secret(unlock_secret);
        check_secret_strength(&secret)?;

        let mut salt = vec![0u8; config::SALT_LEN];
        let mut iv = vec![0u8; config::IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let params = self.kdf_params.clone();
        let plaintext = Zeroizing::new(seed.as_bytes().to_vec());
        let task_salt = salt.clone();
        let task_iv = iv.clone();

        let cipher_text = self
            .run_bounded(move || {
                let mut key = derive_key(&secret, &task_salt, &params)?;
                let cipher = Aes256Gcm::new_from_slice(&key)
                    .map_err(|e| VaultError::Kdf(e.to_string()))?;
                key.zeroize();

                cipher
                    .encrypt(Nonce::from_slice(&task_iv), plaintext.as_slice())
                    .map_err(|e| VaultError::Kdf(e.to_string()))
            })
            .await?;

        tracing::debug!(version = config::ENVELOPE_VERSION, "seed envelope created");
        Ok(EncryptedSeedEnvelope {
            version: config::ENVELOPE_VERSION,
            kdf: self.kdf_params.clone(),
            salt,
            iv,
            cipher_text,
        })
    }

    /// Decrypt `envelope` with `unlock_secret` and return the seed.
    pub async fn unlock(
        &self,
        envelope: &EncryptedSeedEnvelope,
        unlock_secret: &str,
    ) -> Result<Seed, VaultError> {
        if !envelope.is_well_formed() {
            return Err(VaultError::CorruptEnvelope);
        }

        let secret = normalize_secret(unlock_secret);
        let params = envelope.kdf.clone();
        let salt = envelope.salt.clone();
        let iv = envelope.iv.clone();
        let cipher_text = envelope.cipher_text.clone();

        let plaintext = self
            .run_bounded(move || {
                let mut key = derive_key(&secret, &salt, &params)?;
                let cipher = Aes256Gcm::new_from_slice(&key)
                    .map_err(|e| VaultError::Kdf(e.to_string()))?;
                key.zeroize();

                // Wrong secret and tampered data fail identically here.
                cipher
                    .decrypt(Nonce::from_slice(&iv), cipher_text.as_slice())
                    .map(Zeroizing::new)
                    .map_err(|_| VaultError::InvalidSecret)
            })
            .await?;

        Seed::from_entropy(plaintext.to_vec()).map_err(|_| VaultError::CorruptEnvelope)
    }

    /// Re-encrypt under a new secret: unlock with `old_secret`, then
    /// create a fresh envelope (current version, fresh salt/IV) under
    /// `new_secret`.
    ///
    /// The input envelope is untouched and remains valid until the caller
    /// durably persists the returned one.
    pub async fn rotate_secret(
        &self,
        envelope: &EncryptedSeedEnvelope,
        old_secret: &str,
        new_secret: &str,
    ) -> Result<EncryptedSeedEnvelope, VaultError> {
        let seed = self.unlock(envelope, old_secret).await?;
        let rotated = self.create(&seed, new_secret).await?;
        tracing::info!("unlock secret rotated");
        Ok(rotated)
    }

    /// Run a KDF-heavy closure on the blocking pool, bounded by the
    /// configured timeout.
    async fn run_bounded<T, F>(&self, work: F) -> Result<T, VaultError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, VaultError> + Send + 'static,
    {
        tokio::time::timeout(self.kdf_timeout, tokio::task::spawn_blocking(work))
            .await
            .map_err(|_| VaultError::Timeout)?
            .map_err(|e| VaultError::Kdf(e.to_string()))?
    }
}

/// NFKD-normalize the unlock secret so visually identical input unlocks
/// regardless of how the platform keyboard composed it (BIP-39 convention).
fn normalize_secret(secret: &str) -> Zeroizing<String> {
    Zeroizing::new(secret.nfkd().collect())
}

/// Argon2id with the envelope's recorded parameters.
fn derive_key(secret: &str, salt: &[u8], params: &KdfParams) -> Result<[u8; 32], VaultError> {
    let argon_params = Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(params.output_len as usize),
    )
    .map_err(|e| VaultError::Kdf(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(secret.as_bytes(), salt, &mut key)
        .map_err(|e| VaultError::Kdf(e.to_string()))?;
    Ok(key)
}

/// Minimum-entropy policy: length floor plus a coarse charset estimate.
fn check_secret_strength(secret: &str) -> Result<(), VaultError> {
    if secret.chars().count() < config::MIN_SECRET_LEN {
        return Err(VaultError::WeakSecret("shorter than 8 characters"));
    }
    if estimated_entropy_bits(secret) < config::MIN_SECRET_ENTROPY_BITS {
        return Err(VaultError::WeakSecret("too predictable"));
    }
    Ok(())
}

/// `len * log2(charset)` over the character classes present.
fn estimated_entropy_bits(secret: &str) -> f64 {
    let mut charset = 0usize;
    if secret.chars().any(|c| c.is_ascii_lowercase()) {
        charset += 26;
    }
    if secret.chars().any(|c| c.is_ascii_uppercase()) {
        charset += 26;
    }
    if secret.chars().any(|c| c.is_ascii_digit()) {
        charset += 10;
    }
    if secret.chars().any(|c| !c.is_ascii_alphanumeric()) {
        charset += 33;
    }
    secret.chars().count() as f64 * (charset as f64).log2()
}
