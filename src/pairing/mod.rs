// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Device Pairing
//!
//! Binds a mobile signing identity to a web session: the web side shows a
//! short-lived code, the mobile side scans it and answers the embedded
//! challenge with a domain-separated signature. The backend is the
//! authoritative verifier; this module owns the code format, the session
//! state machine, and the mobile-side scan/respond operations.

pub mod code;
pub mod handshake;
pub mod session;

pub use code::PairingChallenge;
pub use handshake::{respond, scan, PairingProof};
pub use session::{PairingSession, PairingStatus};

use crate::keys::KeyError;

/// Pairing error type.
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    /// The scanned payload could not be parsed.
    #[error("malformed pairing code: {0}")]
    MalformedCode(String),

    /// The code's TTL elapsed before the handshake completed.
    #[error("pairing code has expired")]
    ExpiredCode,

    /// The session is not in a state that permits this action.
    #[error("pairing session is {state} and cannot {action}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// The proof was rejected (bad signature or reused challenge).
    #[error("pairing proof rejected: {0}")]
    Rejected(String),

    /// Signing-capability failure (e.g. the wallet closed mid-handshake).
    #[error(transparent)]
    Key(#[from] KeyError),
}
