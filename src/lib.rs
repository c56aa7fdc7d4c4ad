//! Hostvault
//!
//! A persistent, credential-bearing inventory of remote hosts. Hosts are
//! stored with their connection credentials encrypted at rest; groups and
//! key/value variables ride alongside in their own collections.
//!
//! # Architecture
//!
//! - **Crypto Module**: master key handling and AES-256-GCM credential
//!   encryption
//! - **Inventory Module**: entity model and the store with its
//!   uniqueness/batch semantics
//! - **Docstore Module**: document-collection contract and the file-backed
//!   implementation
//! - **Remote Module**: one-shot SSH command execution against stored hosts
//!
//! # Usage
//!
//! ```no_run
//! use hostvault::crypto::{CredentialCipher, MasterKey};
//! use hostvault::inventory::{Credential, Host, InventoryStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cipher = CredentialCipher::new(MasterKey::from_env()?);
//! let store = InventoryStore::open("/var/lib/hostvault".as_ref(), cipher);
//!
//! let host = Host::new("web1", "10.0.0.1", Credential::password("deploy", "s3cret"))?;
//! store.add_host(&host)?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod crypto;
pub mod docstore;
pub mod inventory;
pub mod logging;
pub mod remote;

// Re-export main types
pub use config::Config;
pub use crypto::{CipherError, CredentialCipher, MasterKey, Secret};
pub use inventory::{
    Credential, Host, HostGroup, HostUpdate, InventoryError, InventoryStore, Variable,
};
pub use remote::{CommandOutput, RemoteSession, ResolvedAuth};
