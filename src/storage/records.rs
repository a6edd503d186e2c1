// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a launch.
///
/// `deposit_pending -> withdrawing -> {funded | withdraw_error | deposit_pending}`,
/// then `funded -> launched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStatus {
    DepositPending,
    Withdrawing,
    Funded,
    WithdrawError,
    Launched,
}

impl LaunchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepositPending => "deposit_pending",
            Self::Withdrawing => "withdrawing",
            Self::Funded => "funded",
            Self::WithdrawError => "withdraw_error",
            Self::Launched => "launched",
        }
    }

    /// Pool status that accompanies this launch status.
    pub fn pool_status(self) -> PoolStatus {
        match self {
            Self::DepositPending => PoolStatus::DepositPending,
            Self::Withdrawing => PoolStatus::Withdrawing,
            Self::Funded | Self::Launched => PoolStatus::Withdrawn,
            Self::WithdrawError => PoolStatus::WithdrawError,
        }
    }

    /// Funds have reached the launch wallet; no further pool calls.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Funded | Self::Launched)
    }
}

impl std::fmt::Display for LaunchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of the funds inside the privacy pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    DepositPending,
    Withdrawing,
    Withdrawn,
    WithdrawError,
}

/// Privacy-pool progress of a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub status: PoolStatus,
    /// Set once the pool accepted the deposit; never cleared.
    #[serde(default)]
    pub deposited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_tx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdraw_tx: Option<String>,
    /// Failed pipeline attempts since creation or the last manual retry.
    /// Indexer-lag deferrals are not counted.
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A launch funding request and its progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRecord {
    pub id: String,
    pub owner_user_id: String,
    /// Amount in wei.
    pub requested_amount: u128,
    pub platform_wallet_address: String,
    pub launch_wallet_address: String,
    /// Vault envelope; never returned by the API.
    pub launch_wallet_secret_encrypted: String,
    status: LaunchStatus,
    pool: PoolState,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LaunchRecord {
    /// Create a record in `deposit_pending`.
    pub fn new_pending(
        id: String,
        owner_user_id: String,
        requested_amount: u128,
        platform_wallet_address: String,
        launch_wallet_address: String,
        launch_wallet_secret_encrypted: String,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_user_id,
            requested_amount,
            platform_wallet_address,
            launch_wallet_address,
            launch_wallet_secret_encrypted,
            status: LaunchStatus::DepositPending,
            pool: PoolState {
                status: PoolStatus::DepositPending,
                deposited: false,
                deposit_tx: None,
                withdraw_tx: None,
                attempts: 0,
                last_error: None,
            },
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> LaunchStatus {
        self.status
    }

    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    /// Move to `status`, keeping the pool status in step.
    pub fn set_status(&mut self, status: LaunchStatus) {
        self.status = status;
        self.pool.status = status.pool_status();
    }

    /// Record an accepted deposit.
    pub fn record_deposit(&mut self, tx_ref: Option<String>) {
        self.pool.deposited = true;
        self.pool.deposit_tx = tx_ref;
        self.pool.last_error = None;
    }

    /// Record a completed withdrawal.
    pub fn record_withdrawal(&mut self, tx_ref: String) {
        self.pool.withdraw_tx = Some(tx_ref);
        self.pool.last_error = None;
    }

    /// Record a failed pipeline attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.pool.attempts = self.pool.attempts.saturating_add(1);
        self.pool.last_error = Some(error.into());
    }

    /// Record a deferral that is expected to clear on its own.
    pub fn record_deferral(&mut self, reason: impl Into<String>) {
        self.pool.last_error = Some(reason.into());
    }

    /// Clear the attempt counter after a manual retry.
    pub fn reset_attempts(&mut self) {
        self.pool.attempts = 0;
    }
}

/// Per-user custodial wallet that funds launches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformWallet {
    pub owner_user_id: String,
    pub address: String,
    /// Vault envelope; never returned by the API.
    pub secret_encrypted: String,
    pub created_at: DateTime<Utc>,
}
