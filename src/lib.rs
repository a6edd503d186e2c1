// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Launch Custody Server - Privacy-Pool Launch Funding Service
//!
//! Holds one custodial platform wallet per user and funds launches by
//! depositing into a privacy pool and withdrawing to a fresh launch wallet.
//! Wallet secrets are encrypted at rest by the secret vault.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session token authentication
//! - `blockchain` - Avalanche C-Chain keys, addresses and balance reads
//! - `launch` - Launch lifecycle engine, background dispatch and retry sweep
//! - `pool` - Privacy-pool client
//! - `storage` - redb ledger and audit log
//! - `vault` - Authenticated encryption of custody secrets
//! - `wallet` - Platform and launch wallet provisioning

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod launch;
pub mod pool;
pub mod rate_limit;
pub mod state;
pub mod storage;
pub mod vault;
pub mod wallet;

#[cfg(test)]
mod testing;
