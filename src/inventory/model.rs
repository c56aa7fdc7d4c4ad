//! Inventory entity types.
//!
//! This module defines the value objects stored in the inventory: hosts
//! with their connection credentials, host groups, and flat key/value
//! variables.
//!
//! Entities are snapshots from the caller's perspective: the store copies
//! them into its own representation on write, and later store mutations do
//! not flow back into objects the caller still holds.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Secret;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Errors from entity field validation.
///
/// Raised at construction, before any store interaction and before any
/// encryption.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required identity field was empty.
    #[error("field '{field}' must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The address does not parse as an IPv4 or IPv6 literal.
    #[error("invalid IP address ({value}) provided")]
    InvalidIpAddress {
        /// The offending value.
        value: String,
    },
}

/// How a credential authenticates against the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// The secret is a login password.
    Password,
    /// The secret is a path to a private key file.
    PrivateKeyPath,
}

/// Connection credential for a host.
///
/// The secret carries an explicit plaintext/ciphertext tag; the store
/// encrypts it exactly once before the first persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Login username.
    pub username: String,
    /// Whether the secret is a password or a private key path.
    pub kind: CredentialKind,
    /// The secret value, plaintext or ciphertext.
    pub secret: Secret,
}

impl Credential {
    /// Creates a password credential with a plaintext secret.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            kind: CredentialKind::Password,
            secret: Secret::plaintext(password),
        }
    }

    /// Creates a private-key credential with a plaintext key path.
    #[must_use]
    pub fn private_key(username: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            kind: CredentialKind::PrivateKeyPath,
            secret: Secret::plaintext(key_path),
        }
    }
}

/// A remote host record.
///
/// Identity key is `hostname`: at most one stored host per hostname,
/// matched case-sensitively. The `groups` set may reference group names
/// with no matching [`HostGroup`] record; no referential integrity is
/// enforced between the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Unique hostname.
    pub hostname: String,
    /// IPv4 or IPv6 address, validated at construction.
    pub ip_address: String,
    /// SSH port (default: 22).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection credential.
    pub credential: Credential,
    /// Names of groups this host belongs to.
    #[serde(default)]
    pub groups: BTreeSet<String>,
    /// Free-form key/value variables attached to this host.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Host {
    /// Creates a host with empty group and variable attachments.
    ///
    /// Validation runs here, before the host can reach the store or the
    /// cipher.
    ///
    /// # Errors
    /// Returns `ValidationError` if `hostname` is empty or `ip_address` is
    /// not a valid IPv4/IPv6 literal.
    pub fn new(
        hostname: impl Into<String>,
        ip_address: impl Into<String>,
        credential: Credential,
    ) -> Result<Self, ValidationError> {
        let hostname = hostname.into();
        let ip_address = ip_address.into();

        if hostname.is_empty() {
            return Err(ValidationError::EmptyField { field: "hostname" });
        }
        validate_ip_address(&ip_address)?;

        Ok(Self {
            hostname,
            ip_address,
            port: DEFAULT_PORT,
            credential,
            groups: BTreeSet::new(),
            variables: BTreeMap::new(),
        })
    }

    /// Sets a non-default SSH port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the address string used for connecting (`ip:port`).
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!("{}:{}", self.ip_address, self.port)
    }
}

/// Validates that a string parses as an IPv4 or IPv6 literal.
pub(crate) fn validate_ip_address(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidIpAddress {
            value: value.to_string(),
        })
}

/// A named group of hosts.
///
/// Lifecycle is independent of hosts; deleting a group does not touch the
/// group names recorded on host documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    /// Unique group name.
    pub group_name: String,
    /// Human-readable description.
    pub description: String,
}

impl HostGroup {
    /// Creates a group.
    ///
    /// # Errors
    /// Returns `ValidationError` if `group_name` is empty.
    pub fn new(
        group_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let group_name = group_name.into();
        if group_name.is_empty() {
            return Err(ValidationError::EmptyField { field: "group_name" });
        }

        Ok(Self {
            group_name,
            description: description.into(),
        })
    }
}

/// A flat key/value variable, not scoped to any host or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique variable name.
    pub variable_name: String,
    /// Variable value.
    pub value: String,
}

impl Variable {
    /// Creates a variable.
    ///
    /// # Errors
    /// Returns `ValidationError` if `variable_name` is empty.
    pub fn new(
        variable_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let variable_name = variable_name.into();
        if variable_name.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "variable_name",
            });
        }

        Ok(Self {
            variable_name,
            value: value.into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_host_creation() {
        let host = Host::new(
            "web1",
            "10.0.0.1",
            Credential::password("deploy", "s3cret"),
        )
        .unwrap();

        assert_eq!(host.hostname, "web1");
        assert_eq!(host.ip_address, "10.0.0.1");
        assert_eq!(host.port, DEFAULT_PORT);
        assert!(host.groups.is_empty());
        assert!(host.variables.is_empty());
    }

    #[test]
    fn test_host_with_port() {
        let host = Host::new("web1", "10.0.0.1", Credential::password("deploy", "pw"))
            .unwrap()
            .with_port(2222);

        assert_eq!(host.port, 2222);
        assert_eq!(host.connection_string(), "10.0.0.1:2222");
    }

    #[test]
    fn test_host_accepts_ipv6() {
        let host = Host::new("v6host", "::1", Credential::password("root", "pw"));
        assert!(host.is_ok());
    }

    #[test]
    fn test_host_rejects_invalid_ip() {
        let err = Host::new(
            "bad",
            "999.999.999.999",
            Credential::password("root", "pw"),
        )
        .unwrap_err();

        assert!(matches!(err, ValidationError::InvalidIpAddress { ref value } if value == "999.999.999.999"));
        assert_eq!(
            err.to_string(),
            "invalid IP address (999.999.999.999) provided"
        );
    }

    #[test]
    fn test_host_rejects_hostname_as_address() {
        assert!(Host::new("h", "server.example.com", Credential::password("u", "p")).is_err());
    }

    #[test]
    fn test_host_rejects_empty_hostname() {
        let err = Host::new("", "10.0.0.1", Credential::password("u", "p")).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField { field: "hostname" }));
    }

    #[test]
    fn test_group_requires_name() {
        assert!(HostGroup::new("", "desc").is_err());
        assert!(HostGroup::new("web", "frontend hosts").is_ok());
    }

    #[test]
    fn test_variable_requires_name() {
        assert!(Variable::new("", "v").is_err());

        let var = Variable::new("ansible_user", "deploy").unwrap();
        assert_eq!(var.variable_name, "ansible_user");
        assert_eq!(var.value, "deploy");
    }

    #[test]
    fn test_private_key_credential() {
        let cred = Credential::private_key("ops", "/home/ops/.ssh/id_ed25519");
        assert_eq!(cred.kind, CredentialKind::PrivateKeyPath);
        assert!(!cred.secret.is_ciphertext());
    }

    #[test]
    fn test_host_serde_roundtrip() {
        let mut host = Host::new("db1", "192.168.0.5", Credential::password("admin", "pw"))
            .unwrap()
            .with_port(2200);
        host.groups.insert("databases".to_string());
        host.variables
            .insert("role".to_string(), "primary".to_string());

        let json = serde_json::to_string(&host).unwrap();
        let back: Host = serde_json::from_str(&json).unwrap();
        assert_eq!(back, host);
    }
}
