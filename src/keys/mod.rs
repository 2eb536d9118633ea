// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Management
//!
//! Turns an unlocked seed into usable signing capability without leaking
//! it. See `manager` for the handle model and `seed` for seed lifecycle.

pub mod manager;
pub mod seed;

pub use manager::{AccountHandle, KeyManager, WalletHandle};
pub use seed::Seed;

/// Key-management error type.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The wallet handle was closed; its seed is gone.
    #[error("wallet handle is closed")]
    HandleClosed,

    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("invalid seed length: {len} bytes (expected 16-64)")]
    InvalidSeedLength { len: usize },

    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("signing failed: {0}")]
    Signing(String),
}
