//! AES-256-GCM encryption of credential secrets.
//!
//! A secret is always carried with an explicit state tag, [`Secret::Plaintext`]
//! or [`Secret::Ciphertext`], so re-encryption can be skipped without
//! guessing whether a value "looks" encrypted. The ciphertext form is a
//! base64 envelope of `nonce || ciphertext` with a fresh random nonce per
//! encryption.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::MasterKey;

/// Nonce size in bytes (96 bits for AES-GCM).
const NONCE_SIZE: usize = 12;

/// Errors from cipher operations.
///
/// Messages are deliberately terse: neither key material nor secret
/// content ever appears in them.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Encryption failed. Does not happen for well-formed input.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Input is not a valid ciphertext for the configured key: wrong key,
    /// corrupted envelope, or a value that was never encrypted.
    #[error("decryption failed: not a valid ciphertext for the configured key")]
    DecryptionFailed,
}

/// A credential secret with an explicit encryption state.
///
/// The tag travels with the value through persistence, so a stored secret
/// is never misclassified the way a decrypt-and-catch heuristic can
/// misclassify a plaintext that happens to parse as an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Secret {
    /// The secret as the caller provided it.
    Plaintext(String),
    /// Base64 AEAD envelope produced by [`CredentialCipher::encrypt`].
    Ciphertext(String),
}

impl Secret {
    /// Wraps a plaintext value.
    #[must_use]
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self::Plaintext(value.into())
    }

    /// Returns true if the secret is in its encrypted form.
    #[must_use]
    pub fn is_ciphertext(&self) -> bool {
        matches!(self, Self::Ciphertext(_))
    }
}

/// Symmetric cipher for credential secrets.
///
/// Constructed with an explicit [`MasterKey`]; operations never consult
/// process-global state.
#[derive(Debug, Clone)]
pub struct CredentialCipher {
    key: MasterKey,
}

impl CredentialCipher {
    /// Creates a cipher using the given master key.
    #[must_use]
    pub fn new(key: MasterKey) -> Self {
        Self { key }
    }

    /// Encrypts a plaintext secret into a base64 envelope.
    ///
    /// Any plaintext input produces a decryptable envelope; the error path
    /// exists only for API uniformity and is not reachable for in-memory
    /// buffers.
    ///
    /// # Errors
    /// Returns `CipherError::EncryptionFailed` if the underlying AEAD
    /// rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let cipher = Aes256Gcm::new(self.key.as_bytes().into());

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(STANDARD.encode(envelope))
    }

    /// Decrypts a base64 envelope back to the plaintext secret.
    ///
    /// # Errors
    /// Returns `CipherError::DecryptionFailed` if the input was not
    /// produced by this cipher: wrong key, corrupted data, or a value that
    /// was never encrypted.
    pub fn decrypt(&self, envelope: &str) -> Result<String, CipherError> {
        let bytes = STANDARD
            .decode(envelope)
            .map_err(|_| CipherError::DecryptionFailed)?;

        if bytes.len() <= NONCE_SIZE {
            return Err(CipherError::DecryptionFailed);
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);

        let cipher = Aes256Gcm::new(self.key.as_bytes().into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }

    /// Encrypts a secret if it is still plaintext.
    ///
    /// Idempotent: a `Ciphertext` input is returned unchanged, never
    /// double-encrypted.
    ///
    /// # Errors
    /// Propagates `CipherError::EncryptionFailed` from [`Self::encrypt`].
    pub fn encrypt_secret(&self, secret: &Secret) -> Result<Secret, CipherError> {
        match secret {
            Secret::Plaintext(value) => Ok(Secret::Ciphertext(self.encrypt(value)?)),
            Secret::Ciphertext(_) => Ok(secret.clone()),
        }
    }

    /// Resolves a secret to its plaintext form.
    ///
    /// A `Plaintext` secret is returned as-is; a `Ciphertext` secret is
    /// decrypted.
    ///
    /// # Errors
    /// Returns `CipherError::DecryptionFailed` if a ciphertext cannot be
    /// decrypted with the configured key.
    pub fn reveal(&self, secret: &Secret) -> Result<String, CipherError> {
        match secret {
            Secret::Plaintext(value) => Ok(value.clone()),
            Secret::Ciphertext(envelope) => self.decrypt(envelope),
        }
    }
}
