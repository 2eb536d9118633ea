// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pairing-session state machine.
//!
//! ## Lifecycle
//!
//! ```text
//! pending ──scan──▶ challenged ──proof──▶ verified ──backend──▶ bound
//!    │                  │
//!    └──── ttl / cancel ┴──────────▶ expired (terminal)
//! ```
//!
//! `verified` and `bound` never transition to `expired`; `expired` never
//! transitions anywhere. A challenge is single-use: once a proof is
//! applied, a second proof is rejected regardless of validity.

use chrono::{DateTime, Duration, Utc};
use k256::ecdsa::VerifyingKey;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use alloy::primitives::Signature;
use alloy::signers::utils::public_key_to_address;

use crate::config;

use super::code;
use super::handshake::{pairing_digest, PairingProof};
use super::PairingError;

/// Pairing session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStatus {
    /// Created by the web side; not yet scanned
    Pending,
    /// Mobile scanned the code and holds the challenge
    Challenged,
    /// A valid proof was applied; awaiting backend binding
    Verified,
    /// Web session is authenticated as the mobile identity (terminal)
    Bound,
    /// TTL elapsed or a side cancelled before verification (terminal)
    Expired,
}

impl PairingStatus {
    fn as_str(self) -> &'static str {
        match self {
            PairingStatus::Pending => "pending",
            PairingStatus::Challenged => "challenged",
            PairingStatus::Verified => "verified",
            PairingStatus::Bound => "bound",
            PairingStatus::Expired => "expired",
        }
    }
}

/// One pairing attempt, persistable via `storage::repository::PairingRepository`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingSession {
    pub session_id: Uuid,
    pub challenge: Vec<u8>,
    pub status: PairingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once a proof is accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_public_key: Option<String>,
}

impl PairingSession {
    /// Start a session with a fresh random challenge.
    ///
    /// `ttl_secs` is clamped to the allowed 60–120 s window.
    pub fn begin(ttl_secs: i64) -> Self {
        Self::begin_at(ttl_secs, Utc::now())
    }

    /// Start a session with an explicit clock (tests).
    pub fn begin_at(ttl_secs: i64, now: DateTime<Utc>) -> Self {
        let ttl = ttl_secs.clamp(config::PAIRING_TTL_MIN_SECS, config::PAIRING_TTL_MAX_SECS);

        let mut challenge = vec![0u8; config::PAIRING_CHALLENGE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut challenge);

        let session = Self {
            session_id: Uuid::new_v4(),
            challenge,
            status: PairingStatus::Pending,
            created_at: now,
            expires_at: now + Duration::seconds(ttl),
            mobile_public_key: None,
        };
        tracing::info!(session_id = %session.session_id, ttl, "pairing session created");
        session
    }

    /// The scannable code for this session.
    pub fn code(&self) -> String {
        code::encode(self.session_id, &self.challenge, self.expires_at)
    }

    /// Whether the TTL has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Record that the mobile side scanned the code.
    pub fn mark_scanned(&mut self, now: DateTime<Utc>) -> Result<(), PairingError> {
        self.check_ttl(now)?;
        match self.status {
            PairingStatus::Pending => {
                self.status = PairingStatus::Challenged;
                Ok(())
            }
            other => Err(PairingError::InvalidTransition {
                state: other.as_str(),
                action: "be scanned",
            }),
        }
    }

    /// Apply a submitted proof: single-use, TTL-bounded, signature checked
    /// against the claimed public key.
    ///
    /// The backend remains the authoritative verifier; this check only
    /// gates the local state transition.
    pub fn apply_proof(
        &mut self,
        proof: &PairingProof,
        now: DateTime<Utc>,
    ) -> Result<(), PairingError> {
        self.check_ttl(now)?;
        match self.status {
            PairingStatus::Challenged => {}
            other => {
                return Err(PairingError::InvalidTransition {
                    state: other.as_str(),
                    action: "accept a proof",
                })
            }
        }

        if proof.session_id != self.session_id {
            return Err(PairingError::Rejected("session mismatch".into()));
        }
        verify_proof_signature(proof, &self.challenge)?;

        self.status = PairingStatus::Verified;
        self.mobile_public_key = Some(proof.mobile_public_key.clone());
        tracing::info!(session_id = %self.session_id, "pairing proof verified");
        Ok(())
    }

    /// Backend confirmed the binding; terminal success state.
    pub fn bind(&mut self) -> Result<(), PairingError> {
        match self.status {
            PairingStatus::Verified => {
                self.status = PairingStatus::Bound;
                tracing::info!(session_id = %self.session_id, "pairing session bound");
                Ok(())
            }
            other => Err(PairingError::InvalidTransition {
                state: other.as_str(),
                action: "bind",
            }),
        }
    }

    /// Cancel before verification. Idempotent on already-expired sessions;
    /// verified and bound sessions cannot be cancelled.
    pub fn cancel(&mut self) -> Result<(), PairingError> {
        match self.status {
            PairingStatus::Pending | PairingStatus::Challenged => {
                self.status = PairingStatus::Expired;
                tracing::info!(session_id = %self.session_id, "pairing session cancelled");
                Ok(())
            }
            PairingStatus::Expired => Ok(()),
            other => Err(PairingError::InvalidTransition {
                state: other.as_str(),
                action: "be cancelled",
            }),
        }
    }

    /// Move to `Expired` if the TTL elapsed; error if so.
    fn check_ttl(&mut self, now: DateTime<Utc>) -> Result<(), PairingError> {
        if self.status == PairingStatus::Expired {
            return Err(PairingError::ExpiredCode);
        }
        if matches!(self.status, PairingStatus::Pending | PairingStatus::Challenged)
            && self.is_expired_at(now)
        {
            self.status = PairingStatus::Expired;
            return Err(PairingError::ExpiredCode);
        }
        Ok(())
    }
}

/// Check the proof signature against the claimed public key.
fn verify_proof_signature(proof: &PairingProof, challenge: &[u8]) -> Result<(), PairingError> {
    let pk_bytes = alloy::hex::decode(&proof.mobile_public_key)
        .map_err(|_| PairingError::Rejected("public key is not hex".into()))?;
    let verifying_key = VerifyingKey::from_sec1_bytes(&pk_bytes)
        .map_err(|_| PairingError::Rejected("invalid public key".into()))?;
    let expected = public_key_to_address(&verifying_key);

    let sig_bytes = alloy::hex::decode(&proof.signature)
        .map_err(|_| PairingError::Rejected("signature is not hex".into()))?;
    let signature = Signature::from_raw(&sig_bytes)
        .map_err(|_| PairingError::Rejected("invalid signature encoding".into()))?;

    let digest = pairing_digest(challenge);
    let recovered = signature
        .recover_address_from_prehash(&digest)
        .map_err(|_| PairingError::Rejected("signature does not verify".into()))?;

    if recovered != expected {
        return Err(PairingError::Rejected(
            "signature does not match claimed key".into(),
        ));
    }
    Ok(())
}
