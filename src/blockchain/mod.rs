// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for Avalanche C-Chain.
//!
//! This module provides functionality for:
//! - Querying native AVAX balances
//! - Generating and parsing secp256k1 keys
//! - Validating EVM addresses

pub mod address;
pub mod client;
pub mod keys;
pub mod types;

pub use address::{parse_address, validate_recipient, AddressError};
pub use client::{AvaxClient, BalanceSource, ChainClientError};
pub use keys::{generate_keypair, signer_from_secret, GeneratedKeypair, KeyError};
pub use types::*;
