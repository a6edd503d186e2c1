// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded launch ledger backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `launches`: launch id → serialized LaunchRecord
//! - `user_launches`: composite key (user|!created_at|launch_id) → launch id
//! - `platform_wallets`: user id → serialized PlatformWallet
//! - `audit_events`: see [`super::audit`]
//!
//! Every mutation of a launch goes through [`Ledger::update_launch`], which
//! reads, mutates and writes the record inside a single write transaction.
//! redb serializes write transactions, so a status check made inside the
//! closure is a compare-and-set.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::audit::AUDIT_EVENTS;
use super::records::{LaunchRecord, LaunchStatus, PlatformWallet};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: launch id → serialized LaunchRecord (JSON bytes).
const LAUNCHES: TableDefinition<&str, &[u8]> = TableDefinition::new("launches");

/// Index: composite key → launch id.
/// Key format: `len_be(user) | user | !created_at_be | launch_id` for newest-first scans.
const USER_LAUNCHES: TableDefinition<&[u8], &str> = TableDefinition::new("user_launches");

/// User id → serialized PlatformWallet (JSON bytes).
const PLATFORM_WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("platform_wallets");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Prefix shared by all index keys of one user.
///
/// The user id is length-prefixed so that no user's prefix is a prefix of
/// another user's keys.
fn make_user_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + user_id.len());
    prefix.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    prefix.extend_from_slice(user_id.as_bytes());
    prefix
}

fn make_index_key(user_id: &str, created_at_millis: i64, launch_id: &str) -> Vec<u8> {
    let mut key = make_user_prefix(user_id);
    // Inverted timestamp for descending order (newest first)
    key.extend_from_slice(&(!created_at_millis as u64).to_be_bytes());
    key.extend_from_slice(launch_id.as_bytes());
    key
}

/// Upper bound for a range scan over one user's keys.
fn make_prefix_end(user_id: &str) -> Vec<u8> {
    let mut end = make_user_prefix(user_id);
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// Ledger
// =============================================================================

/// Durable store for launch records and platform wallets.
pub struct Ledger {
    db: Database,
}

impl Ledger {
    /// Open (or create) the ledger at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LAUNCHES)?;
            let _ = write_txn.open_table(USER_LAUNCHES)?;
            let _ = write_txn.open_table(PLATFORM_WALLETS)?;
            let _ = write_txn.open_table(AUDIT_EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(super) fn db(&self) -> &Database {
        &self.db
    }

    /// Verify the database can serve a read transaction.
    pub fn health_check(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(LAUNCHES)?;
        Ok(())
    }

    // =========================================================================
    // Launch records
    // =========================================================================

    /// Insert a new launch and its owner index entry.
    pub fn insert_launch(&self, record: &LaunchRecord) -> LedgerResult<()> {
        let json = serde_json::to_vec(record)?;
        let index_key = make_index_key(
            &record.owner_user_id,
            record.created_at.timestamp_millis(),
            &record.id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LAUNCHES)?;
            if table.get(record.id.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!("launch {}", record.id)));
            }
            table.insert(record.id.as_str(), json.as_slice())?;

            let mut idx_table = write_txn.open_table(USER_LAUNCHES)?;
            idx_table.insert(index_key.as_slice(), record.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a launch by id, regardless of owner.
    pub fn get_launch(&self, id: &str) -> LedgerResult<Option<LaunchRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LAUNCHES)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Atomically read, mutate and write a launch.
    ///
    /// If `mutate` returns an error the transaction is aborted and nothing
    /// is written. `updated_at` is bumped on success.
    pub fn update_launch<F, E>(&self, id: &str, mutate: F) -> Result<LaunchRecord, E>
    where
        F: FnOnce(&mut LaunchRecord) -> Result<(), E>,
        E: From<LedgerError>,
    {
        let write_txn = self.db.begin_write().map_err(LedgerError::from)?;
        let outcome = {
            let mut table = write_txn.open_table(LAUNCHES).map_err(LedgerError::from)?;

            let mut record: LaunchRecord = {
                let existing = table
                    .get(id)
                    .map_err(LedgerError::from)?
                    .ok_or_else(|| LedgerError::NotFound(format!("launch {id}")))?;
                serde_json::from_slice(existing.value()).map_err(LedgerError::from)?
            };

            match mutate(&mut record) {
                Ok(()) => {
                    record.updated_at = Utc::now();
                    let json = serde_json::to_vec(&record).map_err(LedgerError::from)?;
                    table
                        .insert(id, json.as_slice())
                        .map_err(LedgerError::from)?;
                    Ok(record)
                }
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(record) => {
                write_txn.commit().map_err(LedgerError::from)?;
                Ok(record)
            }
            Err(e) => {
                write_txn.abort().map_err(LedgerError::from)?;
                Err(e)
            }
        }
    }

    /// All launches of a user, newest first.
    pub fn list_by_owner(&self, user_id: &str) -> LedgerResult<Vec<LaunchRecord>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(USER_LAUNCHES)?;
        let table = read_txn.open_table(LAUNCHES)?;

        let prefix = make_user_prefix(user_id);
        let prefix_end = make_prefix_end(user_id);

        let mut results = Vec::new();
        for entry in idx_table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, launch_id) = entry?;
            if let Some(value) = table.get(launch_id.value())? {
                let record: LaunchRecord = serde_json::from_slice(value.value())?;
                if record.owner_user_id == user_id {
                    results.push(record);
                }
            }
        }
        Ok(results)
    }

    /// All launches currently in `status`, oldest first.
    pub fn list_by_status(&self, status: LaunchStatus) -> LedgerResult<Vec<LaunchRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LAUNCHES)?;

        let mut results = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: LaunchRecord = serde_json::from_slice(value.value())?;
            if record.status() == status {
                results.push(record);
            }
        }
        results.sort_by_key(|r| r.created_at);
        Ok(results)
    }

    // =========================================================================
    // Platform wallets
    // =========================================================================

    pub fn get_platform_wallet(&self, user_id: &str) -> LedgerResult<Option<PlatformWallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PLATFORM_WALLETS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store `wallet` unless the user already has one.
    ///
    /// Returns the wallet that is stored after the call: the existing one if
    /// present, otherwise `wallet`.
    pub fn insert_platform_wallet_if_absent(
        &self,
        wallet: PlatformWallet,
    ) -> LedgerResult<PlatformWallet> {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut table = write_txn.open_table(PLATFORM_WALLETS)?;
            let existing: Option<PlatformWallet> = match table.get(wallet.owner_user_id.as_str())? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            match existing {
                Some(existing) => existing,
                None => {
                    let json = serde_json::to_vec(&wallet)?;
                    table.insert(wallet.owner_user_id.as_str(), json.as_slice())?;
                    wallet
                }
            }
        };
        write_txn.commit()?;
        Ok(stored)
    }
}

// =============================================================================
// Tests
// =============================================================================
