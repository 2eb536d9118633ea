// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Core Constants
//!
//! This module defines the fixed parameters of the wallet core. None of
//! these are read from the environment; hosts that need different values
//! construct the relevant component with explicit overrides.
//!
//! | Constant | Description | Value |
//! |----------|-------------|-------|
//! | `ENVELOPE_VERSION` | Current seed-envelope format version | `1` |
//! | `KDF_*` | Argon2id defaults for new envelopes | 64 MiB / 3 / 4 |
//! | `KDF_TIMEOUT_SECS` | Upper bound on one KDF computation | `10` |
//! | `MIN_SECRET_LEN` / `MIN_SECRET_ENTROPY_BITS` | Unlock-secret policy | `8` / `40` |
//! | `DEFAULT_DERIVATION_PATH` | BIP-44 account path | `m/44'/60'/0'/0/0` |
//! | `PAIRING_TTL_*` | Pairing-session TTL window | 60–120 s, default 90 |
//! | `PAIRING_DOMAIN_TAG` | Domain separator for pairing signatures | versioned tag |

/// Current version written into new [`EncryptedSeedEnvelope`] records.
///
/// Version 1 = Argon2id key derivation + AES-256-GCM. Readers dispatch on
/// this field; `rotate_secret` re-encrypts old envelopes at the current
/// version.
///
/// [`EncryptedSeedEnvelope`]: crate::vault::EncryptedSeedEnvelope
pub const ENVELOPE_VERSION: u32 = 1;

/// Argon2id memory cost for new envelopes (KiB). 64 MiB.
pub const KDF_M_COST: u32 = 65536;

/// Argon2id time cost (passes) for new envelopes.
pub const KDF_T_COST: u32 = 3;

/// Argon2id parallelism (lanes) for new envelopes.
pub const KDF_P_COST: u32 = 4;

/// Derived-key length in bytes (AES-256 key size).
pub const KDF_OUTPUT_LEN: u32 = 32;

/// Upper bound on a single KDF computation before the vault gives up.
pub const KDF_TIMEOUT_SECS: u64 = 10;

/// Envelope salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM IV length in bytes.
pub const IV_LEN: usize = 12;

/// Minimum unlock-secret length in characters.
pub const MIN_SECRET_LEN: usize = 8;

/// Minimum estimated unlock-secret entropy in bits.
///
/// Estimated as `len * log2(charset)` where the charset size is summed
/// over the character classes present. A deliberately coarse floor; the
/// slow KDF carries the real burden.
pub const MIN_SECRET_ENTROPY_BITS: f64 = 40.0;

/// Default BIP-44 derivation path for the primary account.
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Lower bound on a pairing-session TTL in seconds.
pub const PAIRING_TTL_MIN_SECS: i64 = 60;

/// Upper bound on a pairing-session TTL in seconds.
pub const PAIRING_TTL_MAX_SECS: i64 = 120;

/// Default pairing-session TTL in seconds.
pub const PAIRING_TTL_DEFAULT_SECS: i64 = 90;

/// Pairing challenge length in bytes.
pub const PAIRING_CHALLENGE_LEN: usize = 32;

/// Domain-separation tag prefixed to a pairing challenge before hashing.
///
/// A signature over `keccak256(tag || challenge)` cannot collide with a
/// transaction signature over the same challenge bytes, and the tag is
/// versioned so a future scheme change cannot replay old proofs.
pub const PAIRING_DOMAIN_TAG: &[u8] = b"BULLION_PAIRING_V1:";
