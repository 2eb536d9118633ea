// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Signing
//!
//! EIP-1559 transaction construction and deterministic signing for the
//! settlement chain (Avalanche C-Chain). Nothing here touches the
//! network: gas prices and balances arrive as caller-provided hints, and
//! the signed raw bytes go to an external broadcaster.

pub mod erc20;
pub mod nonce;
pub mod signer;
pub mod types;

pub use nonce::NonceLedger;
pub use signer::{PendingTransaction, SignedTransaction, TransactionSigner};
pub use types::*;

use crate::keys::KeyError;

/// Transaction-signing error type.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Advisory only: the authoritative balance lives server-side.
    #[error("amount plus max fees exceeds the known balance")]
    InsufficientFundsHint,

    /// The nonce is already assigned to a different payload.
    #[error("nonce {nonce} conflicts with an in-flight transaction")]
    NonceConflict { nonce: u64 },

    /// Signing-capability failure (e.g. the wallet closed mid-flight).
    #[error(transparent)]
    Key(#[from] KeyError),
}
