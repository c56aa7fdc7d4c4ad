//! Master key handling for credential encryption.
//!
//! The key is supplied explicitly at construction time; components never
//! look it up from ambient process state. It can be loaded from raw bytes,
//! a base64 string, an environment variable, or a key file.

use std::fs;
use std::io;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key size in bytes (256 bits for AES-256-GCM).
pub const KEY_SIZE: usize = 32;

/// Environment variable holding a base64-encoded master key.
pub const KEY_ENV_VAR: &str = "HOSTVAULT_MASTER_KEY";

/// Errors that can occur while loading a master key.
///
/// Error messages never contain key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key has the wrong number of bytes.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required key size.
        expected: usize,
        /// Size actually provided.
        actual: usize,
    },

    /// Key is not valid base64.
    #[error("key is not valid base64")]
    InvalidEncoding,

    /// Environment variable is missing or unreadable.
    #[error("environment variable {0} is not set")]
    MissingEnvVar(&'static str),

    /// Key file could not be read.
    #[error("failed to read key file: {0}")]
    Io(#[from] io::Error),
}

/// Symmetric master key for credential encryption.
///
/// Zeroed on drop. Never logged, never serialized, never included in
/// error messages.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_SIZE],
}

impl MasterKey {
    /// Creates a master key from raw bytes.
    ///
    /// # Errors
    /// Returns `KeyError::InvalidLength` if `bytes` is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_SIZE {
            return Err(KeyError::InvalidLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Creates a master key from a base64-encoded string.
    ///
    /// # Errors
    /// Returns an error if the input is not base64 or decodes to the wrong
    /// length.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| KeyError::InvalidEncoding)?;
        let result = Self::from_bytes(&bytes);
        bytes.zeroize();
        result
    }

    /// Loads a base64-encoded master key from the `HOSTVAULT_MASTER_KEY`
    /// environment variable.
    ///
    /// # Errors
    /// Returns an error if the variable is unset or holds an invalid key.
    pub fn from_env() -> Result<Self, KeyError> {
        let encoded =
            std::env::var(KEY_ENV_VAR).map_err(|_| KeyError::MissingEnvVar(KEY_ENV_VAR))?;
        Self::from_base64(&encoded)
    }

    /// Loads a base64-encoded master key from a file.
    ///
    /// Trailing whitespace (a final newline, typically) is ignored.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or holds an invalid key.
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let encoded = fs::read_to_string(path)?;
        Self::from_base64(&encoded)
    }

    /// Generates a random master key from the OS entropy source.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Returns the key as a base64 string, for writing to a key file.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.key)
    }

    /// Returns the raw key bytes.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
