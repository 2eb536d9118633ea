// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bullion Wallet Core - Non-Custodial Wallet Core
//!
//! This crate provides the security-critical core of the Bullion mobile
//! wallet: seed custody, signing, and device pairing. It performs no
//! network I/O; broadcasting signed transactions and verifying pairing
//! proofs are external collaborators.
//!
//! ## Modules
//!
//! - `vault` - Encrypted-at-rest seed storage (Argon2id + AES-256-GCM)
//! - `keys` - In-memory seed custody and HD account derivation
//! - `signing` - EIP-1559 transaction construction and deterministic signing
//! - `pairing` - QR challenge/response binding mobile identity to a web session
//! - `storage` - Key-value persistence collaborators (memory, file, redb)
//!
//! ## Security Model
//!
//! - The seed exists in plaintext only inside an open [`keys::WalletHandle`]
//!   and is zeroed on close.
//! - No API returns raw private-key bytes; consumers hold opaque handles
//!   with a sign-digest capability.
//! - The persisted envelope is authenticated; tampering fails decryption
//!   exactly like a wrong unlock secret.

pub mod config;
pub mod keys;
pub mod pairing;
pub mod signing;
pub mod storage;
pub mod vault;
