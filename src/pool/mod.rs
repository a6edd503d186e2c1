// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privacy-pool capability.
//!
//! The pool is consumed as two opaque operations: deposit funds owned by a
//! key, and withdraw them to a recipient. Failures are classified so the
//! launch engine can tell "try again later" from "give up".

pub mod relayer;

use async_trait::async_trait;

pub use relayer::RelayerPoolClient;

use crate::blockchain::validate_recipient;

/// Result of an accepted deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub tx_ref: Option<String>,
}

/// Result of a completed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub tx_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool has not indexed a spendable balance for the owner yet.
    #[error("no spendable pool balance yet: {0}")]
    NoSpendableBalance(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("pool request timed out")]
    Timeout,

    #[error("pool unavailable: {0}")]
    Unavailable(String),

    #[error("pool rejected the request: {0}")]
    Rejected(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("invalid owner key: {0}")]
    InvalidOwnerKey(String),
}

impl PoolError {
    /// Whether the same request may succeed later without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoSpendableBalance(_) | Self::Timeout | Self::Unavailable(_)
        )
    }

    /// Classify a pool failure message that carries no other signal.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        if is_no_spendable_balance(&lower) {
            Self::NoSpendableBalance(message)
        } else if lower.contains("insufficient") {
            Self::InsufficientFunds(message)
        } else {
            Self::Rejected(message)
        }
    }
}

fn is_no_spendable_balance(lower: &str) -> bool {
    lower.contains("need at least 1 unspent utxo")
        || lower.contains("no unspent")
        || lower.contains("no balance")
}

/// Validate a withdrawal recipient before any pool call.
pub fn checked_recipient(raw: &str) -> Result<String, PoolError> {
    validate_recipient(raw)
        .map(|address| address.to_string())
        .map_err(|e| PoolError::InvalidRecipient(e.to_string()))
}

/// Deposit/withdraw capability of a privacy pool.
#[async_trait]
pub trait PrivacyPool: Send + Sync {
    /// Deposit `amount` wei from the wallet controlled by `owner_secret`.
    ///
    /// Every attempt for the same launch must reuse `idempotency_key`, so a
    /// deposit whose acceptance was never observed is not performed twice.
    async fn deposit(
        &self,
        owner_secret: &str,
        amount: u128,
        idempotency_key: &str,
    ) -> Result<DepositReceipt, PoolError>;

    /// Withdraw `amount` wei of the owner's pool balance to `recipient`.
    async fn withdraw(
        &self,
        owner_secret: &str,
        amount: u128,
        recipient: &str,
    ) -> Result<WithdrawReceipt, PoolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_indexer_lag_messages() {
        for message in [
            "Need at least 1 unspent UTXO to perform a withdrawal",
            "need at least 1 unspent utxo",
            "No balance found for owner",
            "owner has no unspent notes",
        ] {
            let err = PoolError::from_message(message);
            assert!(
                matches!(err, PoolError::NoSpendableBalance(_)),
                "{message:?} classified as {err:?}"
            );
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn classifies_insufficient_and_rejections() {
        assert!(matches!(
            PoolError::from_message("insufficient_funds"),
            PoolError::InsufficientFunds(_)
        ));
        let rejected = PoolError::from_message("proof verification failed");
        assert!(matches!(rejected, PoolError::Rejected(_)));
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(PoolError::Timeout.is_retryable());
        assert!(PoolError::Unavailable("503".to_string()).is_retryable());
        assert!(!PoolError::InsufficientFunds("x".to_string()).is_retryable());
        assert!(!PoolError::InvalidRecipient("x".to_string()).is_retryable());
    }

    #[test]
    fn recipient_is_validated() {
        assert!(checked_recipient("0x742d35cc6634c0532925a3b844bc9e7595f0beb1").is_ok());
        assert!(matches!(
            checked_recipient(""),
            Err(PoolError::InvalidRecipient(_))
        ));
        assert!(matches!(
            checked_recipient("0x0000000000000000000000000000000000000000"),
            Err(PoolError::InvalidRecipient(_))
        ));
    }
}
