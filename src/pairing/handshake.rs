// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mobile-side pairing operations: scan the code, answer the challenge.
//!
//! The challenge is never signed raw. It is prefixed with the versioned
//! domain tag and hashed, so a pairing signature cannot be replayed as a
//! transaction signature (or vice versa) even over identical bytes.

use alloy::primitives::{keccak256, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::keys::AccountHandle;

use super::code::{self, PairingChallenge};
use super::PairingError;

/// Proof submitted to the backend to finish the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingProof {
    /// Session being answered
    pub session_id: Uuid,
    /// Hex signature over the domain-separated challenge digest
    pub signature: String,
    /// Compressed SEC1 public key of the signing account, hex-encoded
    pub mobile_public_key: String,
}

/// Parse a scanned payload and enforce its TTL against the current time.
pub fn scan(code: &str) -> Result<PairingChallenge, PairingError> {
    scan_at(code, Utc::now())
}

/// Parse a scanned payload with an explicit clock.
pub fn scan_at(code: &str, now: DateTime<Utc>) -> Result<PairingChallenge, PairingError> {
    let challenge = code::decode(code)?;
    if now > challenge.expires_at {
        tracing::debug!(session_id = %challenge.session_id, "scanned an expired pairing code");
        return Err(PairingError::ExpiredCode);
    }
    Ok(challenge)
}

/// Sign the challenge with the account's key and package the proof.
pub async fn respond(
    challenge: &PairingChallenge,
    account: &AccountHandle,
) -> Result<PairingProof, PairingError> {
    respond_at(challenge, account, Utc::now()).await
}

/// Sign the challenge with an explicit clock.
///
/// Expiry is re-checked here: scanning close to the TTL edge must not
/// produce a proof for a dead session.
pub async fn respond_at(
    challenge: &PairingChallenge,
    account: &AccountHandle,
    now: DateTime<Utc>,
) -> Result<PairingProof, PairingError> {
    if now > challenge.expires_at {
        return Err(PairingError::ExpiredCode);
    }

    let digest = pairing_digest(&challenge.challenge);
    let signature = account.sign_digest(digest).await?;

    tracing::info!(session_id = %challenge.session_id, "pairing challenge answered");
    Ok(PairingProof {
        session_id: challenge.session_id,
        signature: alloy::hex::encode(signature.as_bytes()),
        mobile_public_key: account.public_key_hex(),
    })
}

/// Domain-separated digest of a pairing challenge.
pub(crate) fn pairing_digest(challenge: &[u8]) -> B256 {
    let mut preimage =
        Vec::with_capacity(config::PAIRING_DOMAIN_TAG.len() + challenge.len());
    preimage.extend_from_slice(config::PAIRING_DOMAIN_TAG);
    preimage.extend_from_slice(challenge);
    keccak256(&preimage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyManager, Seed};
    use crate::pairing::PairingSession;
    use chrono::Duration;

    const TEST_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    async fn test_account() -> AccountHandle {
        let manager = KeyManager::new();
        let handle = manager.open(Seed::from_mnemonic(TEST_PHRASE, "").unwrap());
        manager.derive_default_account(&handle).await.unwrap()
    }

    #[test]
    fn scan_within_ttl_succeeds() {
        let now = Utc::now();
        let session = PairingSession::begin_at(60, now);

        let challenge = scan_at(&session.code(), now + Duration::seconds(30)).unwrap();
        assert_eq!(challenge.session_id, session.session_id);
    }

    #[test]
    fn scan_after_ttl_fails_with_expired_code() {
        // 60 s TTL, scanned at 61 s
        let now = Utc::now();
        let session = PairingSession::begin_at(60, now);

        let result = scan_at(&session.code(), now + Duration::seconds(61));
        assert!(matches!(result, Err(PairingError::ExpiredCode)));
    }

    #[test]
    fn scan_of_garbage_fails_with_malformed_code() {
        let result = scan_at("%%%", Utc::now());
        assert!(matches!(result, Err(PairingError::MalformedCode(_))));
    }

    #[tokio::test]
    async fn respond_after_ttl_fails_with_expired_code() {
        let now = Utc::now();
        let session = PairingSession::begin_at(60, now);
        let account = test_account().await;

        let challenge = scan_at(&session.code(), now).unwrap();
        let result = respond_at(&challenge, &account, now + Duration::seconds(61)).await;

        assert!(matches!(result, Err(PairingError::ExpiredCode)));
    }

    #[tokio::test]
    async fn proof_carries_session_and_account_identity() {
        let now = Utc::now();
        let session = PairingSession::begin_at(90, now);
        let account = test_account().await;

        let challenge = scan_at(&session.code(), now).unwrap();
        let proof = respond_at(&challenge, &account, now).await.unwrap();

        assert_eq!(proof.session_id, session.session_id);
        assert_eq!(proof.mobile_public_key, account.public_key_hex());
        // 65-byte signature => 130 hex chars
        assert_eq!(proof.signature.len(), 130);
    }

    #[tokio::test]
    async fn pairing_signature_is_domain_separated() {
        // Scan then respond at 30 s into a 60 s TTL; the proof signature
        // must differ from a transaction-style signature over the same
        // raw challenge bytes.
        let now = Utc::now();
        let session = PairingSession::begin_at(60, now);
        let account = test_account().await;

        let challenge = scan_at(&session.code(), now + Duration::seconds(30)).unwrap();
        let proof = respond_at(&challenge, &account, now + Duration::seconds(30))
            .await
            .unwrap();

        let undomained = account
            .sign_digest(keccak256(&challenge.challenge))
            .await
            .unwrap();

        assert_ne!(proof.signature, alloy::hex::encode(undomained.as_bytes()));
    }

    #[tokio::test]
    async fn closed_wallet_cannot_respond() {
        let now = Utc::now();
        let session = PairingSession::begin_at(90, now);

        let manager = KeyManager::new();
        let handle = manager.open(Seed::from_mnemonic(TEST_PHRASE, "").unwrap());
        let account = manager.derive_default_account(&handle).await.unwrap();
        manager.close(&handle).await;

        let challenge = scan_at(&session.code(), now).unwrap();
        let result = respond_at(&challenge, &account, now).await;

        assert!(matches!(result, Err(PairingError::Key(_))));
    }

    #[test]
    fn digest_depends_on_tag_and_challenge() {
        let a = pairing_digest(b"challenge-a");
        let b = pairing_digest(b"challenge-b");
        assert_ne!(a, b);
        assert_ne!(a, keccak256(b"challenge-a"));
    }
}
