// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Platform and launch wallet provisioning.
//!
//! Each user has one lazily created platform wallet that funds their
//! launches. Launch wallets are generated fresh for every launch. Secrets are
//! encrypted by the vault before they are handed to anything else.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::blockchain::generate_keypair;
use crate::storage::{AuditEvent, AuditEventType, AuditRepository, Ledger, LedgerError, PlatformWallet};
use crate::vault::{SecretVault, VaultError};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("no platform wallet for user {0}")]
    MissingPlatformWallet(String),
}

/// A freshly generated launch wallet.
#[derive(Debug, Clone)]
pub struct GeneratedWallet {
    pub address: String,
    pub secret_encrypted: String,
}

pub struct WalletProvisioner {
    ledger: Arc<Ledger>,
    vault: SecretVault,
}

impl WalletProvisioner {
    pub fn new(ledger: Arc<Ledger>, vault: SecretVault) -> Self {
        Self { ledger, vault }
    }

    /// Return the user's platform wallet address, creating the wallet on first use.
    ///
    /// Concurrent first calls may each generate a keypair; only the first
    /// one persisted is kept and every caller gets its address.
    pub fn get_or_create_platform_wallet(&self, owner_user_id: &str) -> Result<String, ProvisionError> {
        if let Some(existing) = self.ledger.get_platform_wallet(owner_user_id)? {
            return Ok(existing.address);
        }

        let keypair = generate_keypair();
        let candidate = PlatformWallet {
            owner_user_id: owner_user_id.to_string(),
            address: keypair.address,
            secret_encrypted: self.vault.encrypt_str(&keypair.secret_hex)?,
            created_at: Utc::now(),
        };
        let candidate_address = candidate.address.clone();

        let stored = self.ledger.insert_platform_wallet_if_absent(candidate)?;
        if stored.address == candidate_address {
            info!(
                user_id = %owner_user_id,
                address = %stored.address,
                "Platform wallet created"
            );
            let event = AuditEvent::new(AuditEventType::PlatformWalletCreated)
                .with_user(owner_user_id)
                .with_resource("platform_wallet", owner_user_id)
                .with_details(serde_json::json!({ "address": stored.address }));
            if let Err(e) = AuditRepository::new(&self.ledger).log(&event) {
                tracing::warn!(error = %e, "Failed to record audit event");
            }
        }

        Ok(stored.address)
    }

    /// Generate a launch wallet. Nothing is persisted.
    pub fn generate_launch_wallet(&self) -> Result<GeneratedWallet, ProvisionError> {
        let keypair = generate_keypair();
        Ok(GeneratedWallet {
            secret_encrypted: self.vault.encrypt_str(&keypair.secret_hex)?,
            address: keypair.address,
        })
    }

    /// Decrypt the platform wallet secret of a user.
    pub fn platform_secret(&self, owner_user_id: &str) -> Result<String, ProvisionError> {
        let wallet = self
            .ledger
            .get_platform_wallet(owner_user_id)?
            .ok_or_else(|| ProvisionError::MissingPlatformWallet(owner_user_id.to_string()))?;

        Ok(self.vault.decrypt_to_string(&wallet.secret_encrypted)?)
    }
}
