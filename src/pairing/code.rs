// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scannable pairing-code payload.
//!
//! The QR content is a Base64-wrapped JSON record:
//!
//! ```text
//! { "v": 1, "sid": "<uuid>", "challenge": "<64 hex chars>", "exp": <unix secs> }
//! ```
//!
//! `v` gates format evolution the same way the seed envelope's `version`
//! does; an unknown `v` is a malformed code, not a protocol downgrade.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

use super::PairingError;

/// Current pairing-code format version.
pub const CODE_VERSION: u32 = 1;

/// Wire form of the scanned payload.
#[derive(Debug, Serialize, Deserialize)]
struct CodePayload {
    v: u32,
    sid: Uuid,
    challenge: String,
    exp: i64,
}

/// A parsed pairing challenge, ready to be answered.
#[derive(Debug, Clone)]
pub struct PairingChallenge {
    /// Session this challenge belongs to
    pub session_id: Uuid,
    /// Random challenge bytes chosen by the web side
    pub challenge: Vec<u8>,
    /// When the challenge stops being answerable
    pub expires_at: DateTime<Utc>,
}

/// Encode a challenge into the scannable string form.
pub fn encode(session_id: Uuid, challenge: &[u8], expires_at: DateTime<Utc>) -> String {
    let payload = CodePayload {
        v: CODE_VERSION,
        sid: session_id,
        challenge: alloy::hex::encode(challenge),
        exp: expires_at.timestamp(),
    };
    // Serializing a struct of plain fields cannot fail
    let json = serde_json::to_vec(&payload).unwrap_or_default();
    Base64::encode_string(&json)
}

/// Parse the scanned string form back into a challenge.
///
/// Purely structural; TTL enforcement happens in `handshake::scan_at`.
pub fn decode(code: &str) -> Result<PairingChallenge, PairingError> {
    let json = Base64::decode_vec(code.trim())
        .map_err(|_| PairingError::MalformedCode("not base64".into()))?;

    let payload: CodePayload = serde_json::from_slice(&json)
        .map_err(|e| PairingError::MalformedCode(e.to_string()))?;

    if payload.v != CODE_VERSION {
        return Err(PairingError::MalformedCode(format!(
            "unsupported code version {}",
            payload.v
        )));
    }

    let challenge = alloy::hex::decode(&payload.challenge)
        .map_err(|_| PairingError::MalformedCode("challenge is not hex".into()))?;
    if challenge.len() != config::PAIRING_CHALLENGE_LEN {
        return Err(PairingError::MalformedCode("challenge length".into()));
    }

    let expires_at = DateTime::<Utc>::from_timestamp(payload.exp, 0)
        .ok_or_else(|| PairingError::MalformedCode("expiry out of range".into()))?;

    Ok(PairingChallenge {
        session_id: payload.sid,
        challenge,
        expires_at,
    })
}
