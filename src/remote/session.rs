//! Scoped SSH session for one-shot command execution.
//!
//! A [`RemoteSession`] is acquired with an already-resolved plaintext
//! credential, runs one command per [`RemoteSession::execute`] call, and
//! releases the underlying connection when it goes out of scope, whether
//! the work succeeded, failed, or panicked. No pooling, no retries.

use std::io::Read;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::path::PathBuf;
use std::time::Duration;

use ssh2::Session;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::{CipherError, CredentialCipher};
use crate::inventory::model::{Credential, CredentialKind, Host};

/// Default connect/read timeout for remote sessions.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from remote command execution.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The address is not an IPv4/IPv6 literal.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// TCP-level failure: connect timeout, refused, dropped mid-session.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// SSH protocol failure outside of authentication.
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    /// The host rejected the supplied credential.
    #[error("authentication failed for user '{0}'")]
    AuthenticationFailed(String),

    /// The stored credential could not be resolved to plaintext.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// A credential resolved to its plaintext form for session establishment.
///
/// Produced from a stored [`Credential`] via the cipher; the password
/// variant is wiped from memory on drop.
pub enum ResolvedAuth {
    /// Plaintext login password.
    Password(String),
    /// Path to a private key file (the path itself is not a secret).
    PrivateKeyPath(PathBuf),
}

impl ResolvedAuth {
    /// Resolves a stored credential to plaintext.
    ///
    /// # Errors
    /// Returns the cipher's decryption error if the stored secret cannot
    /// be decrypted.
    pub fn resolve(
        credential: &Credential,
        cipher: &CredentialCipher,
    ) -> Result<Self, CipherError> {
        let plaintext = cipher.reveal(&credential.secret)?;
        Ok(match credential.kind {
            CredentialKind::Password => Self::Password(plaintext),
            CredentialKind::PrivateKeyPath => Self::PrivateKeyPath(PathBuf::from(plaintext)),
        })
    }
}

impl Drop for ResolvedAuth {
    fn drop(&mut self) {
        if let Self::Password(password) = self {
            password.zeroize();
        }
    }
}

impl std::fmt::Debug for ResolvedAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password(_) => f.write_str("ResolvedAuth::Password(..)"),
            Self::PrivateKeyPath(path) => f
                .debug_tuple("ResolvedAuth::PrivateKeyPath")
                .field(path)
                .finish(),
        }
    }
}

/// Captured output of a single remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Remote exit status.
    pub exit_status: i32,
}

impl CommandOutput {
    /// Returns true if the command exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

/// An established SSH session to one remote host.
///
/// The connection is released when the session is dropped; [`Self::close`]
/// makes the teardown point explicit.
pub struct RemoteSession {
    session: Session,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession").finish_non_exhaustive()
    }
}

impl RemoteSession {
    /// Connects and authenticates to a remote host.
    ///
    /// # Errors
    /// Returns `RemoteError::AuthenticationFailed` if the host rejects the
    /// credential, `RemoteError::Transport`/`RemoteError::Ssh` for
    /// connection-level failures.
    pub fn connect(
        address: &str,
        port: u16,
        username: &str,
        auth: &ResolvedAuth,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| RemoteError::InvalidAddress(address.to_string()))?;
        let addr = SocketAddr::new(ip, port);

        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut session = Session::new()?;
        session.set_tcp_stream(stream);
        session.handshake()?;

        let auth_result = match auth {
            ResolvedAuth::Password(password) => session.userauth_password(username, password),
            ResolvedAuth::PrivateKeyPath(key_path) => {
                session.userauth_pubkey_file(username, None, key_path, None)
            }
        };
        if auth_result.is_err() || !session.authenticated() {
            return Err(RemoteError::AuthenticationFailed(username.to_string()));
        }

        debug!(address, port, username, "SSH session established");
        Ok(Self { session })
    }

    /// Connects to an inventory host, resolving its stored credential.
    ///
    /// # Errors
    /// Same conditions as [`Self::connect`], plus the cipher's decryption
    /// error for an unresolvable credential.
    pub fn for_host(
        host: &Host,
        cipher: &CredentialCipher,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let auth = ResolvedAuth::resolve(&host.credential, cipher)?;
        Self::connect(
            &host.ip_address,
            host.port,
            &host.credential.username,
            &auth,
            timeout,
        )
    }

    /// Executes one command and captures its output.
    ///
    /// # Errors
    /// Returns `RemoteError::Ssh`/`RemoteError::Transport` if the channel
    /// fails mid-execution.
    pub fn execute(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;
        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        channel.wait_close()?;
        let exit_status = channel.exit_status()?;

        debug!(exit_status, "remote command finished");
        Ok(CommandOutput {
            stdout,
            stderr,
            exit_status,
        })
    }

    /// Releases the session explicitly. Dropping it has the same effect.
    pub fn close(self) {}
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        // Best-effort disconnect; the TCP stream is torn down regardless.
        let _ = self.session.disconnect(None, "session closed", None);
    }
}
