// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Vault
//!
//! Symmetric encryption of private-key material under a server-held master
//! key. The cipher key is derived with HKDF-SHA256 and each encryption uses
//! a fresh random 96-bit nonce with ChaCha20-Poly1305.
//!
//! Envelope format: `v1:<base64 nonce>:<base64 ciphertext+tag>`.

use base64ct::{Base64, Encoding};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

/// Minimum accepted master key length, in bytes.
pub const MIN_MASTER_KEY_LEN: usize = 32;

const KEY_INFO: &[u8] = b"launch-custody/secret-vault/v1";
const ENVELOPE_VERSION: &str = "v1";
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("master key must be at least {MIN_MASTER_KEY_LEN} bytes")]
    WeakMasterKey,

    #[error("encryption failed")]
    EncryptionFailure,

    #[error("decryption failed: {0}")]
    DecryptionFailure(&'static str),
}

/// Encrypts and decrypts secrets with a key derived from the master key.
#[derive(Clone)]
pub struct SecretVault {
    key: [u8; 32],
}

impl std::fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretVault(..)")
    }
}

impl SecretVault {
    pub fn new(master_key: &[u8]) -> Result<Self, VaultError> {
        if master_key.len() < MIN_MASTER_KEY_LEN {
            return Err(VaultError::WeakMasterKey);
        }

        let hkdf = Hkdf::<Sha256>::new(None, master_key);
        let mut key = [0u8; 32];
        hkdf.expand(KEY_INFO, &mut key)
            .map_err(|_| VaultError::WeakMasterKey)?;

        Ok(Self { key })
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key))
    }

    /// Encrypt raw bytes into an envelope string.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, VaultError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::EncryptionFailure)?;

        Ok(format!(
            "{ENVELOPE_VERSION}:{}:{}",
            Base64::encode_string(&nonce),
            Base64::encode_string(&ciphertext)
        ))
    }

    /// Decrypt an envelope produced by [`SecretVault::encrypt`] under the same key.
    pub fn decrypt(&self, envelope: &str) -> Result<Vec<u8>, VaultError> {
        let mut parts = envelope.trim().split(':');
        let (Some(version), Some(nonce_b64), Some(ciphertext_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VaultError::DecryptionFailure("malformed envelope"));
        };

        if version != ENVELOPE_VERSION {
            return Err(VaultError::DecryptionFailure("unsupported envelope version"));
        }

        let nonce = Base64::decode_vec(nonce_b64)
            .map_err(|_| VaultError::DecryptionFailure("invalid nonce encoding"))?;
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::DecryptionFailure("invalid nonce length"));
        }
        let ciphertext = Base64::decode_vec(ciphertext_b64)
            .map_err(|_| VaultError::DecryptionFailure("invalid ciphertext encoding"))?;

        self.cipher()
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| VaultError::DecryptionFailure("authentication failed"))
    }

    /// Encrypt a UTF-8 secret.
    pub fn encrypt_str(&self, plaintext: &str) -> Result<String, VaultError> {
        self.encrypt(plaintext.as_bytes())
    }

    /// Decrypt an envelope holding a UTF-8 secret.
    pub fn decrypt_to_string(&self, envelope: &str) -> Result<String, VaultError> {
        String::from_utf8(self.decrypt(envelope)?)
            .map_err(|_| VaultError::DecryptionFailure("plaintext is not utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &[u8] = b"0123456789abcdef0123456789abcdef";
    const KEY_B: &[u8] = b"fedcba9876543210fedcba9876543210";

    #[test]
    fn encrypt_then_decrypt() {
        let vault = SecretVault::new(KEY_A).unwrap();
        let envelope = vault.encrypt_str("4c0883a69102937d6231471b5dbb6204fe512961708279f2").unwrap();

        assert!(envelope.starts_with("v1:"));
        assert_eq!(
            vault.decrypt_to_string(&envelope).unwrap(),
            "4c0883a69102937d6231471b5dbb6204fe512961708279f2"
        );
    }

    #[test]
    fn nonces_are_fresh() {
        let vault = SecretVault::new(KEY_A).unwrap();
        let a = vault.encrypt(b"same secret").unwrap();
        let b = vault.encrypt(b"same secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn same_master_key_derives_same_cipher_key() {
        let envelope = SecretVault::new(KEY_A).unwrap().encrypt(b"secret").unwrap();
        let other_instance = SecretVault::new(KEY_A).unwrap();
        assert_eq!(other_instance.decrypt(&envelope).unwrap(), b"secret");
    }

    #[test]
    fn wrong_master_key_always_fails() {
        let vault_a = SecretVault::new(KEY_A).unwrap();
        let vault_b = SecretVault::new(KEY_B).unwrap();

        for _ in 0..16 {
            let envelope = vault_a.encrypt(b"private key material").unwrap();
            assert!(matches!(
                vault_b.decrypt(&envelope),
                Err(VaultError::DecryptionFailure(_))
            ));
        }
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let vault = SecretVault::new(KEY_A).unwrap();
        let envelope = vault.encrypt(b"secret").unwrap();

        let (head, ciphertext) = envelope.rsplit_once(':').unwrap();
        let mut bytes = Base64::decode_vec(ciphertext).unwrap();
        bytes[0] ^= 0x01;
        let tampered = format!("{head}:{}", Base64::encode_string(&bytes));

        assert!(matches!(
            vault.decrypt(&tampered),
            Err(VaultError::DecryptionFailure("authentication failed"))
        ));
    }

    #[test]
    fn foreign_input_is_rejected() {
        let vault = SecretVault::new(KEY_A).unwrap();
        for input in ["", "plaintext", "v2:AAAA:BBBB", "v1:!!!:BBBB", "v1:AAAA:BBBB", "v1:a:b:c"] {
            assert!(
                matches!(vault.decrypt(input), Err(VaultError::DecryptionFailure(_))),
                "input {input:?} must not decrypt"
            );
        }
    }

    #[test]
    fn short_master_key_is_rejected() {
        assert!(matches!(
            SecretVault::new(b"too-short"),
            Err(VaultError::WeakMasterKey)
        ));
    }
}
