// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction construction and signing.
//!
//! ## Nonce Discipline
//!
//! Nonces come from the per-account ledger, so two concurrent builds
//! cannot share one. Signing holds an in-flight registry keyed by
//! (account, nonce): re-signing the identical payload is allowed (the
//! output is deterministic anyway), signing a *different* payload for an
//! assigned nonce is a conflict. Replacement-by-fee flows live outside
//! this core.

use std::collections::HashMap;
use std::str::FromStr;

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{keccak256, Address, Bytes, Signature, TxKind, B256, U256};
use tokio::sync::Mutex;

use crate::keys::AccountHandle;

use super::erc20;
use super::nonce::NonceLedger;
use super::types::{ChainConfig, FeePolicy};
use super::SignerError;

/// A fully assembled transaction awaiting signature. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Recipient (token contract for ERC-20 transfers)
    pub to: Address,
    /// Native value in wei
    pub value: U256,
    /// Calldata (empty for native transfers)
    pub input: Bytes,
    /// Assigned account nonce
    pub nonce: u64,
    /// Fee parameters
    pub gas: FeePolicy,
    /// Chain this transaction is valid on
    pub chain_id: u64,
}

impl PendingTransaction {
    fn to_eip1559(&self) -> TxEip1559 {
        TxEip1559 {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit: self.gas.gas_limit,
            max_fee_per_gas: self.gas.max_fee_per_gas,
            max_priority_fee_per_gas: self.gas.max_priority_fee_per_gas,
            to: TxKind::Call(self.to),
            value: self.value,
            access_list: Default::default(),
            input: self.input.clone(),
        }
    }

    /// EIP-1559 signing digest of this payload.
    pub fn signature_hash(&self) -> B256 {
        self.to_eip1559().signature_hash()
    }
}

/// A signed, broadcast-ready transaction.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// The payload that was signed
    pub transaction: PendingTransaction,
    /// Recoverable ECDSA signature
    pub signature: Signature,
    /// EIP-2718 encoded bytes for the RPC broadcaster
    pub raw_bytes: Vec<u8>,
    /// Transaction hash
    pub tx_hash: B256,
}

/// Builds and signs transfers for one settlement chain.
pub struct TransactionSigner {
    chain: ChainConfig,
    nonces: NonceLedger,
    /// (account, nonce) → signing digest of the payload being signed
    in_flight: Mutex<HashMap<(Address, u64), B256>>,
}

impl TransactionSigner {
    pub fn new(chain: ChainConfig) -> Self {
        Self {
            chain,
            nonces: NonceLedger::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Chain this signer builds for.
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Fold an authoritative pending-nonce read into the ledger.
    pub async fn sync_nonce(&self, account: &AccountHandle, chain_next: u64) {
        self.nonces.sync(account.address(), chain_next).await;
    }

    /// Build a native transfer with the next unused nonce.
    ///
    /// `balance_hint` is advisory: when present, amount + worst-case fees
    /// must fit inside it. The authoritative balance lives server-side.
    pub async fn build_transfer(
        &self,
        account: &AccountHandle,
        to: &str,
        amount: U256,
        fees: FeePolicy,
        balance_hint: Option<U256>,
    ) -> Result<PendingTransaction, SignerError> {
        let to = parse_address(to)?;
        if amount.is_zero() {
            return Err(SignerError::InvalidAmount("amount must be positive".into()));
        }
        if let Some(balance) = balance_hint {
            if amount + fees.max_cost() > balance {
                return Err(SignerError::InsufficientFundsHint);
            }
        }

        let nonce = self.nonces.reserve_next(account.address()).await;
        tracing::debug!(from = %account.address(), %to, nonce, "transfer built");
        Ok(PendingTransaction {
            to,
            value: amount,
            input: Bytes::new(),
            nonce,
            gas: fees,
            chain_id: self.chain.chain_id,
        })
    }

    /// Build a native transfer at a caller-chosen nonce (e.g. from a
    /// chain read taken before this signer existed).
    ///
    /// A conflicting request is retried once with a freshly read nonce
    /// before surfacing.
    pub async fn build_transfer_with_nonce(
        &self,
        account: &AccountHandle,
        to: &str,
        amount: U256,
        fees: FeePolicy,
        balance_hint: Option<U256>,
        requested_nonce: u64,
    ) -> Result<PendingTransaction, SignerError> {
        let to = parse_address(to)?;
        if amount.is_zero() {
            return Err(SignerError::InvalidAmount("amount must be positive".into()));
        }
        if let Some(balance) = balance_hint {
            if amount + fees.max_cost() > balance {
                return Err(SignerError::InsufficientFundsHint);
            }
        }

        let address = account.address();
        let nonce = match self.nonces.reserve_exact(address, requested_nonce).await {
            Ok(nonce) => nonce,
            Err(SignerError::NonceConflict { nonce }) => {
                tracing::warn!(%address, nonce, "requested nonce already assigned, retrying with fresh nonce");
                self.nonces.reserve_next(address).await
            }
            Err(e) => return Err(e),
        };

        Ok(PendingTransaction {
            to,
            value: amount,
            input: Bytes::new(),
            nonce,
            gas: fees,
            chain_id: self.chain.chain_id,
        })
    }

    /// Build an ERC-20 `transfer` with the next unused nonce.
    ///
    /// `token_balance_hint` is in token units; gas is still paid in the
    /// native coin and is not checked against it.
    pub async fn build_token_transfer(
        &self,
        account: &AccountHandle,
        token_address: &str,
        to: &str,
        amount: U256,
        fees: FeePolicy,
        token_balance_hint: Option<U256>,
    ) -> Result<PendingTransaction, SignerError> {
        let token = parse_address(token_address)?;
        let to = parse_address(to)?;
        if amount.is_zero() {
            return Err(SignerError::InvalidAmount("amount must be positive".into()));
        }
        if let Some(balance) = token_balance_hint {
            if amount > balance {
                return Err(SignerError::InsufficientFundsHint);
            }
        }

        let nonce = self.nonces.reserve_next(account.address()).await;
        tracing::debug!(from = %account.address(), %token, %to, nonce, "token transfer built");
        Ok(PendingTransaction {
            to: token,
            value: U256::ZERO,
            input: erc20::encode_transfer(to, amount).into(),
            nonce,
            gas: fees,
            chain_id: self.chain.chain_id,
        })
    }

    /// Sign a pending transaction.
    ///
    /// Deterministic: signing the same payload twice yields byte-identical
    /// output. Two *different* payloads for one (account, nonce) are
    /// refused so a replacement can never be half-signed concurrently.
    pub async fn sign(
        &self,
        pending: &PendingTransaction,
        account: &AccountHandle,
    ) -> Result<SignedTransaction, SignerError> {
        let digest = pending.signature_hash();
        let key = (account.address(), pending.nonce);

        // Hold the registry across the signing await: the conflict check
        // and the signature must be one critical section.
        let mut in_flight = self.in_flight.lock().await;
        if let Some(existing) = in_flight.get(&key) {
            if *existing != digest {
                return Err(SignerError::NonceConflict {
                    nonce: pending.nonce,
                });
            }
        }

        let signature = account.sign_digest(digest).await?;
        in_flight.insert(key, digest);
        drop(in_flight);

        let signed = pending.to_eip1559().into_signed(signature);
        let envelope = TxEnvelope::Eip1559(signed);
        let raw_bytes = envelope.encoded_2718();
        let tx_hash = keccak256(&raw_bytes);

        tracing::info!(%tx_hash, nonce = pending.nonce, "transaction signed");
        Ok(SignedTransaction {
            transaction: pending.clone(),
            signature,
            raw_bytes,
            tx_hash,
        })
    }
}

/// Parse and validate a recipient address.
///
/// Mixed-case input must carry a valid EIP-55 checksum; all-lowercase
/// input (no checksum information) is accepted as-is.
fn parse_address(s: &str) -> Result<Address, SignerError> {
    let trimmed = s.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(SignerError::InvalidAddress(format!(
            "expected 0x-prefixed 40-hex-char address, got {} chars",
            trimmed.len()
        )));
    }

    let body = &trimmed[2..];
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());

    if has_upper && has_lower {
        Address::parse_checksummed(trimmed, None)
            .map_err(|_| SignerError::InvalidAddress("checksum mismatch".to_string()))
    } else {
        Address::from_str(trimmed)
            .map_err(|e| SignerError::InvalidAddress(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyManager, Seed};
    use crate::signing::types::{parse_amount, AVAX_FUJI, BXAU_TOKEN};
    use std::sync::Arc;

    const TEST_PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    // Checksummed recipient (EIP-55 form of a well-known test address)
    const RECIPIENT: &str = "0x5425890298aed601595a70AB815c96711a31Bc65";

    async fn test_account() -> AccountHandle {
        let manager = KeyManager::new();
        let handle = manager.open(Seed::from_mnemonic(TEST_PHRASE, "").unwrap());
        manager.derive_default_account(&handle).await.unwrap()
    }

    fn one_coin() -> U256 {
        U256::from(1_000_000_000_000_000_000u64)
    }

    #[tokio::test]
    async fn sequential_transfers_get_sequential_nonces() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;
        let amount = parse_amount("1.5", 18).unwrap();

        let first = signer
            .build_transfer(&account, RECIPIENT, amount, FeePolicy::standard(), None)
            .await
            .unwrap();
        // Second transfer before the first is broadcast
        let second = signer
            .build_transfer(&account, RECIPIENT, amount, FeePolicy::standard(), None)
            .await
            .unwrap();

        assert_eq!(second.nonce, first.nonce + 1);
        assert_eq!(first.value, amount);
        assert_eq!(first.chain_id, AVAX_FUJI.chain_id);
    }

    #[tokio::test]
    async fn concurrent_builds_never_share_a_nonce() {
        let signer = Arc::new(TransactionSigner::new(AVAX_FUJI));
        let account = test_account().await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let signer = Arc::clone(&signer);
            let account = account.clone();
            tasks.push(tokio::spawn(async move {
                signer
                    .build_transfer(&account, RECIPIENT, U256::from(1u64), FeePolicy::standard(), None)
                    .await
                    .unwrap()
                    .nonce
            }));
        }

        let mut nonces = Vec::new();
        for task in tasks {
            nonces.push(task.await.unwrap());
        }
        nonces.sort_unstable();
        nonces.dedup();
        assert_eq!(nonces.len(), 16);
    }

    #[tokio::test]
    async fn bad_checksum_is_rejected() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        // Flip the case of one letter in a checksummed address
        let broken = RECIPIENT.replace("AB", "Ab");
        let result = signer
            .build_transfer(&account, &broken, one_coin(), FeePolicy::standard(), None)
            .await;

        assert!(matches!(result, Err(SignerError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn lowercase_address_is_accepted() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        let lowered = RECIPIENT.to_lowercase();
        let result = signer
            .build_transfer(&account, &lowered, one_coin(), FeePolicy::standard(), None)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn malformed_addresses_are_rejected() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        for bad in ["", "0x1234", "not-an-address", "5425890298aed601595a70AB815c96711a31Bc65"] {
            let result = signer
                .build_transfer(&account, bad, one_coin(), FeePolicy::standard(), None)
                .await;
            assert!(matches!(result, Err(SignerError::InvalidAddress(_))), "accepted {bad:?}");
        }
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        let result = signer
            .build_transfer(&account, RECIPIENT, U256::ZERO, FeePolicy::standard(), None)
            .await;
        assert!(matches!(result, Err(SignerError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn balance_hint_bounds_amount_plus_fees() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;
        let fees = FeePolicy::standard();

        // Exactly the amount, no headroom for fees
        let result = signer
            .build_transfer(&account, RECIPIENT, one_coin(), fees.clone(), Some(one_coin()))
            .await;
        assert!(matches!(result, Err(SignerError::InsufficientFundsHint)));

        // Amount plus worst-case fees fits
        let generous = one_coin() + fees.max_cost();
        let result = signer
            .build_transfer(&account, RECIPIENT, one_coin(), fees, Some(generous))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn signing_is_deterministic() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        let pending = signer
            .build_transfer(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None)
            .await
            .unwrap();

        let first = signer.sign(&pending, &account).await.unwrap();
        let second = signer.sign(&pending, &account).await.unwrap();

        assert_eq!(first.signature.as_bytes(), second.signature.as_bytes());
        assert_eq!(first.raw_bytes, second.raw_bytes);
        assert_eq!(first.tx_hash, second.tx_hash);
    }

    #[tokio::test]
    async fn signed_bytes_are_eip1559_typed() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        let pending = signer
            .build_transfer(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None)
            .await
            .unwrap();
        let signed = signer.sign(&pending, &account).await.unwrap();

        assert_eq!(signed.raw_bytes[0], 0x02);
        assert_eq!(signed.tx_hash, keccak256(&signed.raw_bytes));
    }

    #[tokio::test]
    async fn different_payload_for_same_nonce_is_refused() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        let pending = signer
            .build_transfer(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None)
            .await
            .unwrap();
        signer.sign(&pending, &account).await.unwrap();

        // Same nonce, different value
        let mut replacement = pending.clone();
        replacement.value = one_coin() + U256::from(1u64);

        let result = signer.sign(&replacement, &account).await;
        assert!(matches!(result, Err(SignerError::NonceConflict { .. })));
    }

    #[tokio::test]
    async fn closed_wallet_fails_signing_mid_flight() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let manager = KeyManager::new();
        let handle = manager.open(Seed::from_mnemonic(TEST_PHRASE, "").unwrap());
        let account = manager.derive_default_account(&handle).await.unwrap();

        let pending = signer
            .build_transfer(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None)
            .await
            .unwrap();

        manager.close(&handle).await;
        let result = signer.sign(&pending, &account).await;
        assert!(matches!(result, Err(SignerError::Key(_))));
    }

    #[tokio::test]
    async fn sync_nonce_starts_counter_at_chain_value() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        signer.sync_nonce(&account, 41).await;
        let pending = signer
            .build_transfer(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None)
            .await
            .unwrap();
        assert_eq!(pending.nonce, 41);
    }

    #[tokio::test]
    async fn conflicting_explicit_nonce_retries_once_with_fresh_read() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;

        // Nonces 0 and 1 already assigned
        for _ in 0..2 {
            signer
                .build_transfer(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None)
                .await
                .unwrap();
        }

        // Caller insists on stale nonce 0; the retry lands on a fresh one
        let pending = signer
            .build_transfer_with_nonce(&account, RECIPIENT, one_coin(), FeePolicy::standard(), None, 0)
            .await
            .unwrap();
        assert_eq!(pending.nonce, 2);
    }

    #[tokio::test]
    async fn token_transfer_carries_calldata_and_zero_value() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;
        let token = BXAU_TOKEN.fuji_address.unwrap();

        let pending = signer
            .build_token_transfer(
                &account,
                token,
                RECIPIENT,
                U256::from(500u64),
                FeePolicy::token_standard(),
                Some(U256::from(1_000u64)),
            )
            .await
            .unwrap();

        assert_eq!(pending.value, U256::ZERO);
        assert_eq!(pending.to, parse_address(token).unwrap());
        assert_eq!(&pending.input[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[tokio::test]
    async fn token_transfer_checks_token_balance_hint() {
        let signer = TransactionSigner::new(AVAX_FUJI);
        let account = test_account().await;
        let token = BXAU_TOKEN.fuji_address.unwrap();

        let result = signer
            .build_token_transfer(
                &account,
                token,
                RECIPIENT,
                U256::from(2_000u64),
                FeePolicy::token_standard(),
                Some(U256::from(1_000u64)),
            )
            .await;
        assert!(matches!(result, Err(SignerError::InsufficientFundsHint)));
    }
}
