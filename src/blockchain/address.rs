// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM address validation.

use std::str::FromStr;

use alloy::primitives::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address must be 0x followed by 40 hex characters")]
    Malformed,

    #[error("address must not be the zero address")]
    Zero,
}

/// Parse a `0x`-prefixed, 40-hex-character address.
pub fn parse_address(raw: &str) -> Result<Address, AddressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }

    let Some(hex) = raw.strip_prefix("0x") else {
        return Err(AddressError::Malformed);
    };
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AddressError::Malformed);
    }

    Address::from_str(raw).map_err(|_| AddressError::Malformed)
}

/// Parse an address that is allowed to receive funds.
pub fn validate_recipient(raw: &str) -> Result<Address, AddressError> {
    let address = parse_address(raw)?;
    if address.is_zero() {
        return Err(AddressError::Zero);
    }
    Ok(address)
}
