//! Host inventory management.
//!
//! Provides functionality for:
//! - The entity model: hosts, host groups, key/value variables
//! - The persistent store with hostname uniqueness and credential
//!   encryption on write
//! - Partial-merge updates and idempotent deletes

pub mod model;
pub mod store;

pub use model::{
    Credential, CredentialKind, DEFAULT_PORT, Host, HostGroup, ValidationError, Variable,
};
pub use store::{
    GroupUpdate, HostUpdate, InventoryError, InventoryStore, VariableUpdate,
};
