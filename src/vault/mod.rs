// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Vault
//!
//! Durable, confidentiality- and integrity-protected storage of the
//! wallet seed: Argon2id key derivation over a per-envelope salt,
//! AES-256-GCM authenticated encryption, versioned envelope format.
//! Persistence of the resulting envelope belongs to the caller (see
//! `storage::repository::EnvelopeRepository`).
//!
//! The unlock secret is whatever the host supplies: a typed password or
//! PIN, or material released by a platform biometric gate. The vault
//! only ever sees the bytes.

pub mod envelope;
pub mod secret_vault;

pub use envelope::{EncryptedSeedEnvelope, KdfParams};
pub use secret_vault::{SecretVault, VaultError};
