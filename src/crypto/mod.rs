//! Credential encryption.
//!
//! - [`MasterKey`]: symmetric key loaded once at process start and passed
//!   in explicitly
//! - [`CredentialCipher`]: AES-256-GCM encrypt/decrypt of credential
//!   secrets
//! - [`Secret`]: a credential value tagged as plaintext or ciphertext

pub mod cipher;
pub mod key;

pub use cipher::{CipherError, CredentialCipher, Secret};
pub use key::{KEY_SIZE, KeyError, MasterKey};
