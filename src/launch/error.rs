// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch lifecycle errors.

use crate::pool::PoolError;
use crate::storage::LedgerError;
use crate::vault::VaultError;
use crate::wallet::ProvisionError;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Rejected input; nothing was created or changed.
    #[error("{0}")]
    Validation(String),

    /// Missing, or owned by someone else.
    #[error("launch not found")]
    NotFound,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The pool could not act yet; the launch stays retryable.
    #[error("privacy pool temporarily unavailable: {0}")]
    TransientPoolUnavailable(String),

    #[error("failed to decrypt custody secret")]
    DecryptionFailure,

    #[error("withdrawal failed: {0}")]
    TerminalWithdrawError(String),

    /// The launch is not in a state that allows the operation.
    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] LedgerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProvisionError> for LaunchError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Vault(VaultError::DecryptionFailure(_)) => Self::DecryptionFailure,
            ProvisionError::Vault(e) => Self::Internal(e.to_string()),
            ProvisionError::Ledger(e) => Self::Storage(e),
            ProvisionError::MissingPlatformWallet(user) => {
                Self::Internal(format!("no platform wallet for user {user}"))
            }
        }
    }
}

impl From<PoolError> for LaunchError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::NoSpendableBalance(_) | PoolError::Timeout | PoolError::Unavailable(_) => {
                Self::TransientPoolUnavailable(err.to_string())
            }
            PoolError::InsufficientFunds(msg) => Self::InsufficientFunds(msg),
            PoolError::InvalidRecipient(msg) => Self::Validation(msg),
            PoolError::Rejected(_) | PoolError::InvalidOwnerKey(_) => {
                Self::TerminalWithdrawError(err.to_string())
            }
        }
    }
}
