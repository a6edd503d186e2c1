// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 key generation and parsing.
//!
//! Secrets are handled as the 32-byte scalar hex-encoded without a `0x`
//! prefix. Callers are expected to encrypt them with the vault before they
//! reach storage.

use alloy::{primitives::keccak256, signers::local::PrivateKeySigner};
use k256::{ecdsa::SigningKey, elliptic_curve::rand_core::OsRng};

/// A freshly generated keypair. The secret is plaintext; do not log it.
pub struct GeneratedKeypair {
    pub address: String,
    pub secret_hex: String,
}

impl std::fmt::Debug for GeneratedKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Generate a random secp256k1 keypair and derive its EVM address.
pub fn generate_keypair() -> GeneratedKeypair {
    let signing_key = SigningKey::random(&mut OsRng);

    // Uncompressed SEC1 point; skip the 0x04 tag before hashing.
    let public_key = signing_key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&public_key.as_bytes()[1..]);
    let address = format!("0x{}", alloy::hex::encode(&hash[12..]));

    GeneratedKeypair {
        address,
        secret_hex: alloy::hex::encode(signing_key.to_bytes()),
    }
}

/// Build a signer from a hex-encoded secret (with or without `0x`).
pub fn signer_from_secret(secret_hex: &str) -> Result<PrivateKeySigner, KeyError> {
    let key_bytes = alloy::hex::decode(secret_hex.trim())
        .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
}
