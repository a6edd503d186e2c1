// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Launch Lifecycle Engine
//!
//! ```text
//! create ──► deposit_pending ──deposit──► withdrawing ──withdraw──► funded ──► launched
//!                 ▲                            │
//!                 └──── not yet spendable ─────┤
//!                                              └──── rejected ──► withdraw_error
//! ```
//!
//! Creation is synchronous and never touches the pool. Execution (deposit,
//! then withdraw) runs from the background dispatcher and may be invoked any
//! number of times for the same launch:
//!
//! - executions of one launch are serialized in-process;
//! - every transition is a compare-and-set on the expected status inside a
//!   single ledger write transaction;
//! - settled launches (`funded`, `launched`) never reach the pool again;
//! - an accepted deposit is remembered, so a later run only retries the
//!   withdrawal.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::LaunchError;
use crate::blockchain::{format_native, BalanceSource};
use crate::pool::{checked_recipient, PoolError, PrivacyPool};
use crate::storage::{
    AuditEvent, AuditEventType, AuditRepository, LaunchRecord, LaunchStatus, Ledger, OwnershipCheck,
};
use crate::wallet::{ProvisionError, WalletProvisioner};

/// Tunables of the lifecycle.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Smallest accepted launch amount, in wei.
    pub min_launch_amount: u128,
    /// Failed attempts after which the sweeper stops retrying a launch.
    pub max_attempts: u32,
}

/// Returned to the caller of [`LaunchEngine::create_launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLaunch {
    pub id: String,
    pub launch_wallet_address: String,
}

/// Per-launch async locks.
#[derive(Default)]
struct RecordLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RecordLocks {
    async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Relayer idempotency key shared by every deposit attempt of one launch.
fn deposit_key(launch_id: &str) -> String {
    format!("deposit:{launch_id}")
}

fn expect_status(record: &LaunchRecord, expected: &[LaunchStatus]) -> Result<(), LaunchError> {
    if expected.contains(&record.status()) {
        Ok(())
    } else {
        Err(LaunchError::Conflict(format!(
            "launch {} is {}",
            record.id,
            record.status()
        )))
    }
}

pub struct LaunchEngine {
    ledger: Arc<Ledger>,
    wallets: WalletProvisioner,
    pool: Arc<dyn PrivacyPool>,
    chain: Arc<dyn BalanceSource>,
    settings: LaunchSettings,
    locks: RecordLocks,
}

impl LaunchEngine {
    pub fn new(
        ledger: Arc<Ledger>,
        wallets: WalletProvisioner,
        pool: Arc<dyn PrivacyPool>,
        chain: Arc<dyn BalanceSource>,
        settings: LaunchSettings,
    ) -> Self {
        Self {
            ledger,
            wallets,
            pool,
            chain,
            settings,
            locks: RecordLocks::default(),
        }
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Reject zero and below-minimum amounts.
    pub fn validate_amount(&self, amount: u128) -> Result<(), LaunchError> {
        if amount == 0 {
            return Err(LaunchError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if amount < self.settings.min_launch_amount {
            return Err(LaunchError::Validation(format!(
                "minimum launch amount is {} wei ({})",
                self.settings.min_launch_amount,
                format_native(self.settings.min_launch_amount)
            )));
        }
        Ok(())
    }

    /// Platform wallet address of a user, created on first use.
    pub fn platform_wallet(&self, owner: &str) -> Result<String, LaunchError> {
        Ok(self.wallets.get_or_create_platform_wallet(owner)?)
    }

    /// Create a launch in `deposit_pending`. No pool call is made.
    pub async fn create_launch(
        &self,
        owner: &str,
        amount: u128,
        metadata: serde_json::Value,
    ) -> Result<CreatedLaunch, LaunchError> {
        self.validate_amount(amount)?;

        let platform_address = self.wallets.get_or_create_platform_wallet(owner)?;
        self.ensure_platform_balance(owner, &platform_address, amount)
            .await?;

        let launch_wallet = self.wallets.generate_launch_wallet()?;
        let record = LaunchRecord::new_pending(
            Uuid::new_v4().to_string(),
            owner.to_string(),
            amount,
            platform_address,
            launch_wallet.address,
            launch_wallet.secret_encrypted,
            metadata,
        );
        self.ledger.insert_launch(&record)?;

        info!(
            launch_id = %record.id,
            user_id = %owner,
            amount_wei = %amount,
            launch_wallet = %record.launch_wallet_address,
            "Launch created"
        );
        self.audit(
            AuditEvent::new(AuditEventType::LaunchCreated)
                .with_user(owner)
                .with_resource("launch", &record.id)
                .with_details(serde_json::json!({
                    "amount_wei": amount.to_string(),
                    "launch_wallet_address": record.launch_wallet_address,
                })),
        );

        Ok(CreatedLaunch {
            id: record.id,
            launch_wallet_address: record.launch_wallet_address,
        })
    }

    /// Best-effort balance check; an unreadable balance does not block creation.
    async fn ensure_platform_balance(
        &self,
        owner: &str,
        address: &str,
        amount: u128,
    ) -> Result<(), LaunchError> {
        match self.chain.native_balance(address).await {
            Ok(balance) if balance < amount => {
                info!(
                    user_id = %owner,
                    balance_wei = %balance,
                    amount_wei = %amount,
                    "Platform wallet balance below launch amount"
                );
                Err(LaunchError::InsufficientFunds(format!(
                    "platform wallet {address} holds {} but the launch needs {}; fund it and try again",
                    format_native(balance),
                    format_native(amount)
                )))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(
                    user_id = %owner,
                    error = %e,
                    "Platform wallet balance check failed; continuing"
                );
                Ok(())
            }
        }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run the deposit/withdraw pipeline for one launch.
    ///
    /// Returns the status the launch ended in. Safe to call repeatedly.
    pub async fn execute_launch(&self, owner: &str, id: &str) -> Result<LaunchStatus, LaunchError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load_owned(owner, id)?;

        let status = record.status();
        if status.is_settled() {
            debug!(launch_id = %id, status = %status, "Launch already settled");
            return Ok(status);
        }
        match status {
            LaunchStatus::DepositPending => {}
            LaunchStatus::WithdrawError => {
                debug!(launch_id = %id, "Launch awaits manual retry");
                return Ok(LaunchStatus::WithdrawError);
            }
            LaunchStatus::Withdrawing => {
                warn!(
                    launch_id = %id,
                    "Launch left in withdrawing by an interrupted run; manual retry required"
                );
                return Ok(LaunchStatus::Withdrawing);
            }
            LaunchStatus::Funded | LaunchStatus::Launched => return Ok(status),
        }

        let record = if record.pool().deposited {
            info!(launch_id = %id, "Deposit already accepted; retrying withdrawal");
            self.update(id, |r| {
                expect_status(r, &[LaunchStatus::DepositPending])?;
                r.set_status(LaunchStatus::Withdrawing);
                Ok(())
            })?
        } else {
            self.deposit(record).await?
        };

        self.withdraw(record).await
    }

    /// `deposit_pending -> withdrawing`.
    async fn deposit(&self, record: LaunchRecord) -> Result<LaunchRecord, LaunchError> {
        let secret = self.owner_secret(&record)?;

        let idempotency_key = deposit_key(&record.id);
        match self
            .pool
            .deposit(&secret, record.requested_amount, &idempotency_key)
            .await
        {
            Ok(receipt) => {
                let updated = self.update(&record.id, |r| {
                    expect_status(r, &[LaunchStatus::DepositPending])?;
                    r.record_deposit(receipt.tx_ref.clone());
                    r.set_status(LaunchStatus::Withdrawing);
                    Ok(())
                })?;
                info!(
                    launch_id = %record.id,
                    deposit_tx = receipt.tx_ref.as_deref().unwrap_or("-"),
                    "Deposit accepted by pool"
                );
                self.audit(
                    AuditEvent::new(AuditEventType::DepositSubmitted)
                        .with_user(&record.owner_user_id)
                        .with_resource("launch", &record.id),
                );
                Ok(updated)
            }
            Err(e) => {
                warn!(launch_id = %record.id, error = %e, "Deposit failed");
                self.update(&record.id, |r| {
                    r.record_failure(e.to_string());
                    Ok(())
                })?;
                self.audit(
                    AuditEvent::new(AuditEventType::DepositFailed)
                        .with_user(&record.owner_user_id)
                        .with_resource("launch", &record.id)
                        .failed(e.to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// `withdrawing -> funded | deposit_pending | withdraw_error`.
    async fn withdraw(&self, record: LaunchRecord) -> Result<LaunchStatus, LaunchError> {
        let recipient = match checked_recipient(&record.launch_wallet_address) {
            Ok(recipient) => recipient,
            Err(e) => {
                error!(launch_id = %record.id, error = %e, "Launch wallet address is invalid");
                self.update(&record.id, |r| {
                    r.record_failure(e.to_string());
                    r.set_status(LaunchStatus::WithdrawError);
                    Ok(())
                })?;
                return Err(LaunchError::Validation(e.to_string()));
            }
        };
        let secret = self.owner_secret(&record)?;

        match self
            .pool
            .withdraw(&secret, record.requested_amount, &recipient)
            .await
        {
            Ok(receipt) => {
                self.update(&record.id, |r| {
                    expect_status(r, &[LaunchStatus::Withdrawing])?;
                    r.record_withdrawal(receipt.tx_ref.clone());
                    r.set_status(LaunchStatus::Funded);
                    Ok(())
                })?;
                info!(
                    launch_id = %record.id,
                    withdraw_tx = %receipt.tx_ref,
                    "Launch funded"
                );
                self.audit(
                    AuditEvent::new(AuditEventType::LaunchFunded)
                        .with_user(&record.owner_user_id)
                        .with_resource("launch", &record.id)
                        .with_details(serde_json::json!({ "withdraw_tx": receipt.tx_ref })),
                );
                Ok(LaunchStatus::Funded)
            }
            Err(e) if e.is_retryable() => {
                self.update(&record.id, |r| {
                    expect_status(r, &[LaunchStatus::Withdrawing])?;
                    // Indexer lag is expected and does not use up the attempt budget.
                    if matches!(e, PoolError::NoSpendableBalance(_)) {
                        r.record_deferral(e.to_string());
                    } else {
                        r.record_failure(e.to_string());
                    }
                    r.set_status(LaunchStatus::DepositPending);
                    Ok(())
                })?;
                info!(
                    launch_id = %record.id,
                    reason = %e,
                    "Withdrawal deferred; launch back to deposit_pending"
                );
                self.audit(
                    AuditEvent::new(AuditEventType::WithdrawDeferred)
                        .with_user(&record.owner_user_id)
                        .with_resource("launch", &record.id)
                        .failed(e.to_string()),
                );
                Ok(LaunchStatus::DepositPending)
            }
            Err(e) => {
                self.update(&record.id, |r| {
                    expect_status(r, &[LaunchStatus::Withdrawing])?;
                    r.record_failure(e.to_string());
                    r.set_status(LaunchStatus::WithdrawError);
                    Ok(())
                })?;
                error!(launch_id = %record.id, error = %e, "Withdrawal failed");
                self.audit(
                    AuditEvent::new(AuditEventType::WithdrawFailed)
                        .with_user(&record.owner_user_id)
                        .with_resource("launch", &record.id)
                        .failed(e.to_string()),
                );
                Err(LaunchError::TerminalWithdrawError(e.to_string()))
            }
        }
    }

    /// Decrypt the platform wallet secret; a vault failure parks the launch.
    fn owner_secret(&self, record: &LaunchRecord) -> Result<String, LaunchError> {
        match self.wallets.platform_secret(&record.owner_user_id) {
            Ok(secret) => Ok(secret),
            Err(ProvisionError::Vault(e)) => {
                error!(
                    launch_id = %record.id,
                    user_id = %record.owner_user_id,
                    error = %e,
                    "Failed to decrypt platform wallet secret"
                );
                self.update(&record.id, |r| {
                    r.record_failure("secret decryption failed");
                    r.set_status(LaunchStatus::WithdrawError);
                    Ok(())
                })?;
                self.audit(
                    AuditEvent::new(AuditEventType::DecryptionFailed)
                        .with_user(&record.owner_user_id)
                        .with_resource("launch", &record.id)
                        .failed(e.to_string()),
                );
                Err(LaunchError::DecryptionFailure)
            }
            Err(e @ ProvisionError::MissingPlatformWallet(_)) => {
                error!(
                    launch_id = %record.id,
                    user_id = %record.owner_user_id,
                    "Launch has no platform wallet"
                );
                self.update(&record.id, |r| {
                    r.record_failure(e.to_string());
                    Ok(())
                })?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Manual operations
    // =========================================================================

    /// Put a `withdraw_error` (or interrupted `withdrawing`) launch back into
    /// `deposit_pending` with a fresh attempt budget.
    ///
    /// Settled launches are returned unchanged. Execution is left to the caller.
    pub async fn prepare_retry(&self, owner: &str, id: &str) -> Result<LaunchStatus, LaunchError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load_owned(owner, id)?;

        let status = record.status();
        if status.is_settled() {
            return Ok(status);
        }
        match status {
            LaunchStatus::Funded | LaunchStatus::Launched => Ok(status),
            LaunchStatus::DepositPending => {
                self.update(id, |r| {
                    r.reset_attempts();
                    Ok(())
                })?;
                Ok(LaunchStatus::DepositPending)
            }
            LaunchStatus::WithdrawError | LaunchStatus::Withdrawing => {
                let previous = record.status();
                self.update(id, |r| {
                    expect_status(r, &[LaunchStatus::WithdrawError, LaunchStatus::Withdrawing])?;
                    r.reset_attempts();
                    r.set_status(LaunchStatus::DepositPending);
                    Ok(())
                })?;
                info!(launch_id = %id, from = %previous, "Launch reset for retry");
                self.audit(
                    AuditEvent::new(AuditEventType::LaunchRetried)
                        .with_user(owner)
                        .with_resource("launch", id)
                        .with_details(serde_json::json!({ "from": previous.as_str() })),
                );
                Ok(LaunchStatus::DepositPending)
            }
        }
    }

    /// Reset a launch for retry and run the pipeline.
    pub async fn retry_launch(&self, owner: &str, id: &str) -> Result<LaunchStatus, LaunchError> {
        self.prepare_retry(owner, id).await?;
        self.execute_launch(owner, id).await
    }

    /// Record that the downstream launch step consumed the funds.
    pub async fn mark_launched(&self, owner: &str, id: &str) -> Result<LaunchStatus, LaunchError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load_owned(owner, id)?;

        match record.status() {
            LaunchStatus::Launched => Ok(LaunchStatus::Launched),
            LaunchStatus::Funded => {
                self.update(id, |r| {
                    expect_status(r, &[LaunchStatus::Funded])?;
                    r.set_status(LaunchStatus::Launched);
                    Ok(())
                })?;
                info!(launch_id = %id, "Launch marked launched");
                self.audit(
                    AuditEvent::new(AuditEventType::LaunchMarkedLaunched)
                        .with_user(owner)
                        .with_resource("launch", id),
                );
                Ok(LaunchStatus::Launched)
            }
            other => Err(LaunchError::Conflict(format!(
                "launch is {other}; only funded launches can be marked launched"
            ))),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_launch(&self, owner: &str, id: &str) -> Result<LaunchRecord, LaunchError> {
        self.load_owned(owner, id)
    }

    /// Launches of `owner`, newest first.
    pub fn list_launches(&self, owner: &str) -> Result<Vec<LaunchRecord>, LaunchError> {
        Ok(self.ledger.list_by_owner(owner)?)
    }

    /// Audit trail of one launch, oldest first.
    pub fn launch_events(&self, owner: &str, id: &str) -> Result<Vec<AuditEvent>, LaunchError> {
        self.load_owned(owner, id)?;
        Ok(AuditRepository::new(&self.ledger).list_for_resource(id)?)
    }

    /// `deposit_pending` launches still within their attempt budget.
    pub fn pending_launches(&self) -> Result<Vec<LaunchRecord>, LaunchError> {
        Ok(self
            .ledger
            .list_by_status(LaunchStatus::DepositPending)?
            .into_iter()
            .filter(|r| r.pool().attempts < self.settings.max_attempts)
            .collect())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn load_owned(&self, owner: &str, id: &str) -> Result<LaunchRecord, LaunchError> {
        self.ledger
            .get_launch(id)?
            .owned_by(owner)
            .ok_or(LaunchError::NotFound)
    }

    fn update<F>(&self, id: &str, mutate: F) -> Result<LaunchRecord, LaunchError>
    where
        F: FnOnce(&mut LaunchRecord) -> Result<(), LaunchError>,
    {
        self.ledger.update_launch(id, mutate)
    }

    fn audit(&self, event: AuditEvent) {
        if let Err(e) = AuditRepository::new(&self.ledger).log(&event) {
            warn!(error = %e, "Failed to record audit event");
        }
    }
}
