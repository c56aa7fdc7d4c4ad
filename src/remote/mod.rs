//! Remote command execution over SSH.
//!
//! Thin collaborator around the inventory: resolve a stored credential to
//! plaintext, open one session, run one command, release the session.

pub mod session;

pub use session::{
    CommandOutput, DEFAULT_TIMEOUT, RemoteError, RemoteSession, ResolvedAuth,
};
