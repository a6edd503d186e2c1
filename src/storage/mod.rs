// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent state lives in a single redb database under `DATA_DIR`.
//!
//! ## Storage Layout
//!
//! ```text
//! ledger.redb
//!   launches          launch id -> LaunchRecord
//!   user_launches     user|!created_at|launch id -> launch id
//!   platform_wallets  user id -> PlatformWallet
//!   audit_events      timestamp|event id -> AuditEvent
//! ```
//!
//! Private keys are stored only as vault envelopes (see [`crate::vault`]).

pub mod audit;
pub mod ledger;
pub mod ownership;
pub mod records;

pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use ledger::{Ledger, LedgerError, LedgerResult};
pub use ownership::{OwnedResource, OwnershipCheck};
pub use records::{LaunchRecord, LaunchStatus, PlatformWallet, PoolState, PoolStatus};
