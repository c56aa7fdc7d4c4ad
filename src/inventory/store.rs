//! The inventory store.
//!
//! CRUD and batch operations over hosts, groups, and variables against the
//! document layer. The store encrypts credentials on every write path,
//! enforces hostname uniqueness, and holds no state of its own between
//! calls; the backing collections are the single source of truth.
//!
//! Duplicate checking happens twice: an application-level existence check
//! as a fast path, and the collection's unique key constraint as the
//! authoritative guard. Two concurrent `add_host` calls for the same name
//! can both pass the fast path; only one survives the insert.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::model::{
    Credential, Host, HostGroup, ValidationError, Variable, validate_ip_address,
};
use crate::crypto::{CipherError, CredentialCipher, Secret};
use crate::docstore::{Document, DocumentCollection, DocumentError, FileCollection, Filter};

/// Collection file name for hosts.
const HOSTS_FILE: &str = "hosts.json";

/// Collection file name for groups.
const GROUPS_FILE: &str = "groups.json";

/// Collection file name for variables.
const VARIABLES_FILE: &str = "variables.json";

/// Errors from inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// One or more hostnames already exist. For batch adds the message
    /// names every duplicate, comma-joined.
    #[error("hostname(s) '{0}' already exists in the inventory")]
    DuplicateHostname(String),

    /// The group name already exists.
    #[error("group '{0}' already exists in the inventory")]
    DuplicateGroup(String),

    /// The variable name already exists.
    #[error("variable '{0}' already exists in the inventory")]
    DuplicateVariable(String),

    /// Entity field validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Credential encryption or decryption failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The backing store failed; propagated unmodified.
    #[error("storage error: {0}")]
    Store(#[from] DocumentError),
}

/// Partial update for a host document.
///
/// Only the fields set here are merged into the stored document; everything
/// else is untouched.
#[derive(Debug, Clone, Default)]
pub struct HostUpdate {
    hostname: Option<String>,
    ip_address: Option<String>,
    port: Option<u16>,
    credential: Option<Credential>,
    groups: Option<BTreeSet<String>>,
    variables: Option<BTreeMap<String, String>>,
}

impl HostUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the host. The new name must not collide with another host.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Changes the IP address. Validated when the update is applied.
    #[must_use]
    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Changes the SSH port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Replaces the credential. Encrypted before it is written.
    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Replaces the group membership set.
    #[must_use]
    pub fn groups(mut self, groups: BTreeSet<String>) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Replaces the variable map.
    #[must_use]
    pub fn variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Validates the update and renders it as a partial document.
    fn to_document(&self, cipher: &CredentialCipher) -> Result<Document, InventoryError> {
        let mut changes = Document::new();

        if let Some(ref hostname) = self.hostname {
            if hostname.is_empty() {
                return Err(ValidationError::EmptyField { field: "hostname" }.into());
            }
            changes.insert("hostname".to_string(), Value::String(hostname.clone()));
        }
        if let Some(ref ip_address) = self.ip_address {
            validate_ip_address(ip_address)?;
            changes.insert("ip_address".to_string(), Value::String(ip_address.clone()));
        }
        if let Some(port) = self.port {
            changes.insert("port".to_string(), Value::from(port));
        }
        if let Some(ref credential) = self.credential {
            let mut stored = credential.clone();
            stored.secret = cipher.encrypt_secret(&stored.secret)?;
            changes.insert("credential".to_string(), to_json(&stored)?);
        }
        if let Some(ref groups) = self.groups {
            changes.insert("groups".to_string(), to_json(groups)?);
        }
        if let Some(ref variables) = self.variables {
            changes.insert("variables".to_string(), to_json(variables)?);
        }

        Ok(changes)
    }
}

/// Partial update for a group document.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    description: Option<String>,
}

impl GroupUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_document(&self) -> Document {
        let mut changes = Document::new();
        if let Some(ref description) = self.description {
            changes.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        changes
    }
}

/// Partial update for a variable document.
#[derive(Debug, Clone, Default)]
pub struct VariableUpdate {
    value: Option<String>,
}

impl VariableUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the value.
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn to_document(&self) -> Document {
        let mut changes = Document::new();
        if let Some(ref value) = self.value {
            changes.insert("value".to_string(), Value::String(value.clone()));
        }
        changes
    }
}

/// Serializes an entity into a JSON value.
fn to_json<T: serde::Serialize>(entity: &T) -> Result<Value, InventoryError> {
    serde_json::to_value(entity)
        .map_err(DocumentError::from)
        .map_err(InventoryError::from)
}

/// Serializes an entity into a document map.
fn to_document<T: serde::Serialize>(entity: &T) -> Result<Document, InventoryError> {
    match to_json(entity)? {
        Value::Object(doc) => Ok(doc),
        _ => unreachable!("inventory entities serialize to JSON objects"),
    }
}

/// Persistent inventory of hosts, groups, and variables.
///
/// Each entity kind lives in its own collection with its own unique key,
/// so a hostname and a group name that coincide never collide. One store
/// instance can be shared across callers; every operation is a blocking
/// round trip to the backing collections.
#[derive(Debug)]
pub struct InventoryStore<C: DocumentCollection = FileCollection> {
    hosts: C,
    groups: C,
    variables: C,
    cipher: CredentialCipher,
}

impl InventoryStore<FileCollection> {
    /// Opens a file-backed inventory under the given data directory.
    ///
    /// Collection files are created lazily on first write.
    #[must_use]
    pub fn open(data_dir: &Path, cipher: CredentialCipher) -> Self {
        Self::with_collections(
            FileCollection::open(data_dir.join(HOSTS_FILE), "hostname"),
            FileCollection::open(data_dir.join(GROUPS_FILE), "group_name"),
            FileCollection::open(data_dir.join(VARIABLES_FILE), "variable_name"),
            cipher,
        )
    }
}

impl<C: DocumentCollection> InventoryStore<C> {
    /// Creates a store over explicit collections.
    ///
    /// The collections must enforce uniqueness on `hostname`, `group_name`,
    /// and `variable_name` respectively; the store's own duplicate checks
    /// are only a fast path.
    #[must_use]
    pub fn with_collections(hosts: C, groups: C, variables: C, cipher: CredentialCipher) -> Self {
        Self {
            hosts,
            groups,
            variables,
            cipher,
        }
    }

    // --- hosts ---

    /// Checks whether a hostname already exists, by exact match.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn is_duplicate_hostname(&self, hostname: &str) -> Result<bool, InventoryError> {
        Ok(self
            .hosts
            .find_one(&Filter::by("hostname", hostname))?
            .is_some())
    }

    /// Renders a host as its stored document, credential encrypted.
    fn host_document(&self, host: &Host) -> Result<Document, InventoryError> {
        let mut stored = host.clone();
        stored.credential.secret = self.cipher.encrypt_secret(&stored.credential.secret)?;
        to_document(&stored)
    }

    /// Rebuilds a host from its stored document.
    fn host_from_document(&self, doc: Document, decrypt: bool) -> Result<Host, InventoryError> {
        let mut host: Host =
            serde_json::from_value(Value::Object(doc)).map_err(DocumentError::from)?;
        if decrypt {
            let plaintext = self.cipher.reveal(&host.credential.secret)?;
            host.credential.secret = Secret::Plaintext(plaintext);
        }
        Ok(host)
    }

    /// Translates a storage-level hostname conflict into the inventory
    /// error; everything else propagates unmodified.
    fn map_host_conflict(err: DocumentError) -> InventoryError {
        match err {
            DocumentError::DuplicateKey { ref field, ref value } if field == "hostname" => {
                InventoryError::DuplicateHostname(value.clone())
            }
            other => InventoryError::Store(other),
        }
    }

    /// Adds a host to the inventory.
    ///
    /// The credential is encrypted (idempotently) before the insert. On a
    /// duplicate hostname nothing is written.
    ///
    /// # Errors
    /// Returns `InventoryError::DuplicateHostname` if the hostname already
    /// exists.
    pub fn add_host(&self, host: &Host) -> Result<(), InventoryError> {
        if self.is_duplicate_hostname(&host.hostname)? {
            return Err(InventoryError::DuplicateHostname(host.hostname.clone()));
        }

        let doc = self.host_document(host)?;
        self.hosts.insert_one(doc).map_err(Self::map_host_conflict)?;

        info!(hostname = %host.hostname, "host added");
        Ok(())
    }

    /// Adds multiple hosts to the inventory.
    ///
    /// Hosts with an unseen hostname are encrypted and inserted as one
    /// batch; hosts whose hostname already exists (in the store or earlier
    /// in the batch) are excluded and collected. The insert of the valid
    /// subset always proceeds (partial success is the defined policy),
    /// and afterwards, if any duplicates were found, the call fails naming
    /// all of them.
    ///
    /// # Errors
    /// Returns `InventoryError::DuplicateHostname` with the comma-joined
    /// duplicate names; the non-duplicate subset is committed regardless.
    pub fn add_hosts(&self, hosts: &[Host]) -> Result<(), InventoryError> {
        let mut duplicates = Vec::new();
        let mut pending = Vec::new();
        let mut batch_names = BTreeSet::new();

        for host in hosts {
            if self.is_duplicate_hostname(&host.hostname)?
                || !batch_names.insert(host.hostname.clone())
            {
                duplicates.push(host.hostname.clone());
            } else {
                pending.push(self.host_document(host)?);
            }
        }

        let inserted = pending.len();
        if !pending.is_empty() {
            self.hosts
                .insert_many(pending)
                .map_err(Self::map_host_conflict)?;
        }

        if duplicates.is_empty() {
            info!(count = inserted, "hosts added");
            Ok(())
        } else {
            info!(
                count = inserted,
                rejected = duplicates.len(),
                "batch add committed with duplicates rejected"
            );
            Err(InventoryError::DuplicateHostname(duplicates.join(", ")))
        }
    }

    /// Merges the given fields into an existing host document.
    ///
    /// Fields not named in the update are untouched. Updating a hostname
    /// that does not exist is a no-op, not an error. A credential update
    /// passes through the same idempotent encryption as `add_host`.
    ///
    /// # Errors
    /// Returns `InventoryError::DuplicateHostname` if a rename collides
    /// with another host, `InventoryError::Validation` for a malformed
    /// replacement field.
    pub fn update_host(&self, hostname: &str, update: &HostUpdate) -> Result<(), InventoryError> {
        let changes = update.to_document(&self.cipher)?;
        if changes.is_empty() {
            return Ok(());
        }

        let updated = self
            .hosts
            .update_one(&Filter::by("hostname", hostname), changes)
            .map_err(Self::map_host_conflict)?;
        debug!(hostname, updated, "host update");
        Ok(())
    }

    /// Deletes a host. Deleting a nonexistent hostname is a no-op.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn delete_host(&self, hostname: &str) -> Result<(), InventoryError> {
        let removed = self
            .hosts
            .delete_one(&Filter::by("hostname", hostname))?;
        if removed {
            info!(hostname, "host deleted");
        }
        Ok(())
    }

    /// Retrieves a host by hostname.
    ///
    /// By default the credential is returned exactly as stored (ciphertext
    /// if it was encrypted on write). With `decrypt` the secret is resolved
    /// to plaintext before returning.
    ///
    /// # Errors
    /// Returns the cipher's decryption error if `decrypt` is requested and
    /// the stored value cannot be decrypted.
    pub fn get_host_by_name(
        &self,
        hostname: &str,
        decrypt: bool,
    ) -> Result<Option<Host>, InventoryError> {
        match self.hosts.find_one(&Filter::by("hostname", hostname))? {
            Some(doc) => Ok(Some(self.host_from_document(doc, decrypt)?)),
            None => Ok(None),
        }
    }

    /// Retrieves all hosts, in store iteration order.
    ///
    /// Same `decrypt` semantics as [`Self::get_host_by_name`].
    ///
    /// # Errors
    /// Returns the cipher's decryption error if `decrypt` is requested and
    /// any stored value cannot be decrypted.
    pub fn get_hosts(&self, decrypt: bool) -> Result<Vec<Host>, InventoryError> {
        self.hosts
            .find(&Filter::all())?
            .into_iter()
            .map(|doc| self.host_from_document(doc, decrypt))
            .collect()
    }

    // --- groups ---

    /// Adds a group.
    ///
    /// # Errors
    /// Returns `InventoryError::DuplicateGroup` if the group name already
    /// exists.
    pub fn add_group(&self, group: &HostGroup) -> Result<(), InventoryError> {
        if self.get_group_by_name(&group.group_name)?.is_some() {
            return Err(InventoryError::DuplicateGroup(group.group_name.clone()));
        }

        self.groups
            .insert_one(to_document(group)?)
            .map_err(|err| match err {
                DocumentError::DuplicateKey { ref field, ref value } if field == "group_name" => {
                    InventoryError::DuplicateGroup(value.clone())
                }
                other => InventoryError::Store(other),
            })?;

        info!(group = %group.group_name, "group added");
        Ok(())
    }

    /// Merges the given fields into an existing group. No-op on miss.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn update_group(
        &self,
        group_name: &str,
        update: &GroupUpdate,
    ) -> Result<(), InventoryError> {
        let changes = update.to_document();
        if changes.is_empty() {
            return Ok(());
        }

        let updated = self
            .groups
            .update_one(&Filter::by("group_name", group_name), changes)?;
        debug!(group_name, updated, "group update");
        Ok(())
    }

    /// Deletes a group. Deleting a nonexistent group is a no-op.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn delete_group(&self, group_name: &str) -> Result<(), InventoryError> {
        let removed = self
            .groups
            .delete_one(&Filter::by("group_name", group_name))?;
        if removed {
            info!(group_name, "group deleted");
        }
        Ok(())
    }

    /// Retrieves a group by name.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn get_group_by_name(&self, group_name: &str) -> Result<Option<HostGroup>, InventoryError> {
        match self.groups.find_one(&Filter::by("group_name", group_name))? {
            Some(doc) => {
                let group = serde_json::from_value(Value::Object(doc))
                    .map_err(DocumentError::from)?;
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    /// Retrieves all groups.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn get_groups(&self) -> Result<Vec<HostGroup>, InventoryError> {
        self.groups
            .find(&Filter::all())?
            .into_iter()
            .map(|doc| {
                serde_json::from_value(Value::Object(doc))
                    .map_err(DocumentError::from)
                    .map_err(InventoryError::from)
            })
            .collect()
    }

    // --- variables ---

    /// Adds a variable.
    ///
    /// # Errors
    /// Returns `InventoryError::DuplicateVariable` if the variable name
    /// already exists.
    pub fn add_variable(&self, variable: &Variable) -> Result<(), InventoryError> {
        if self.get_variable_by_name(&variable.variable_name)?.is_some() {
            return Err(InventoryError::DuplicateVariable(
                variable.variable_name.clone(),
            ));
        }

        self.variables
            .insert_one(to_document(variable)?)
            .map_err(|err| match err {
                DocumentError::DuplicateKey { ref field, ref value }
                    if field == "variable_name" =>
                {
                    InventoryError::DuplicateVariable(value.clone())
                }
                other => InventoryError::Store(other),
            })?;

        info!(variable = %variable.variable_name, "variable added");
        Ok(())
    }

    /// Merges the given fields into an existing variable. No-op on miss.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn update_variable(
        &self,
        variable_name: &str,
        update: &VariableUpdate,
    ) -> Result<(), InventoryError> {
        let changes = update.to_document();
        if changes.is_empty() {
            return Ok(());
        }

        let updated = self
            .variables
            .update_one(&Filter::by("variable_name", variable_name), changes)?;
        debug!(variable_name, updated, "variable update");
        Ok(())
    }

    /// Deletes a variable. Deleting a nonexistent variable is a no-op.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn delete_variable(&self, variable_name: &str) -> Result<(), InventoryError> {
        let removed = self
            .variables
            .delete_one(&Filter::by("variable_name", variable_name))?;
        if removed {
            info!(variable_name, "variable deleted");
        }
        Ok(())
    }

    /// Retrieves a variable by name.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn get_variable_by_name(
        &self,
        variable_name: &str,
    ) -> Result<Option<Variable>, InventoryError> {
        match self
            .variables
            .find_one(&Filter::by("variable_name", variable_name))?
        {
            Some(doc) => {
                let variable = serde_json::from_value(Value::Object(doc))
                    .map_err(DocumentError::from)?;
                Ok(Some(variable))
            }
            None => Ok(None),
        }
    }

    /// Retrieves all variables.
    ///
    /// # Errors
    /// Returns `InventoryError::Store` on backing-store failure.
    pub fn get_variables(&self) -> Result<Vec<Variable>, InventoryError> {
        self.variables
            .find(&Filter::all())?
            .into_iter()
            .map(|doc| {
                serde_json::from_value(Value::Object(doc))
                    .map_err(DocumentError::from)
                    .map_err(InventoryError::from)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;

    fn test_store() -> (tempfile::TempDir, InventoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let cipher = CredentialCipher::new(MasterKey::from_bytes(&[9u8; 32]).unwrap());
        let store = InventoryStore::open(dir.path(), cipher);
        (dir, store)
    }

    fn host(hostname: &str, ip: &str) -> Host {
        Host::new(hostname, ip, Credential::password("deploy", "s3cret")).unwrap()
    }

    #[test]
    fn test_add_host_encrypts_credential() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        let stored = store.get_host_by_name("web1", false).unwrap().unwrap();
        assert!(stored.credential.secret.is_ciphertext());
        assert_ne!(stored.credential.secret, Secret::plaintext("s3cret"));

        let revealed = store.get_host_by_name("web1", true).unwrap().unwrap();
        assert_eq!(revealed.credential.secret, Secret::plaintext("s3cret"));
    }

    #[test]
    fn test_add_host_rejects_duplicate() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        let err = store.add_host(&host("web1", "10.0.0.99")).unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateHostname(ref n) if n == "web1"));

        // The original record is unmodified.
        let stored = store.get_host_by_name("web1", false).unwrap().unwrap();
        assert_eq!(stored.ip_address, "10.0.0.1");
        assert_eq!(store.get_hosts(false).unwrap().len(), 1);
    }

    #[test]
    fn test_hostname_match_is_case_sensitive() {
        let (_dir, store) = test_store();
        store.add_host(&host("Web1", "10.0.0.1")).unwrap();

        assert!(!store.is_duplicate_hostname("web1").unwrap());
        assert!(store.get_host_by_name("web1", false).unwrap().is_none());
    }

    #[test]
    fn test_add_hosts_partial_success() {
        let (_dir, store) = test_store();
        store.add_host(&host("b", "10.0.0.2")).unwrap();

        let batch = [
            host("a", "10.0.0.1"),
            host("b", "10.0.0.2"),
            host("c", "10.0.0.3"),
        ];
        let err = store.add_hosts(&batch).unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateHostname(ref n) if n == "b"));

        // a and c were committed despite the failure.
        let names: Vec<String> = store
            .get_hosts(false)
            .unwrap()
            .into_iter()
            .map(|h| h.hostname)
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"c".to_string()));
    }

    #[test]
    fn test_add_hosts_names_all_duplicates() {
        let (_dir, store) = test_store();
        store.add_host(&host("a", "10.0.0.1")).unwrap();
        store.add_host(&host("b", "10.0.0.2")).unwrap();

        let err = store
            .add_hosts(&[host("a", "10.0.0.1"), host("b", "10.0.0.2")])
            .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateHostname(ref n) if n == "a, b"));
    }

    #[test]
    fn test_add_hosts_rejects_in_batch_duplicate() {
        let (_dir, store) = test_store();

        let err = store
            .add_hosts(&[host("a", "10.0.0.1"), host("a", "10.0.0.9")])
            .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateHostname(ref n) if n == "a"));

        // The first occurrence was committed.
        let stored = store.get_host_by_name("a", false).unwrap().unwrap();
        assert_eq!(stored.ip_address, "10.0.0.1");
    }

    #[test]
    fn test_update_host_merges_partial_fields() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        store
            .update_host("web1", &HostUpdate::new().ip_address("10.0.0.2"))
            .unwrap();

        let stored = store.get_host_by_name("web1", true).unwrap().unwrap();
        assert_eq!(stored.ip_address, "10.0.0.2");
        // Untouched fields survive the merge.
        assert_eq!(stored.port, 22);
        assert_eq!(stored.credential.secret, Secret::plaintext("s3cret"));
    }

    #[test]
    fn test_update_host_validates_ip() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        let err = store
            .update_host("web1", &HostUpdate::new().ip_address("not-an-ip"))
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn test_update_host_encrypts_new_credential() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        store
            .update_host(
                "web1",
                &HostUpdate::new().credential(Credential::password("deploy", "rotated")),
            )
            .unwrap();

        let stored = store.get_host_by_name("web1", false).unwrap().unwrap();
        assert!(stored.credential.secret.is_ciphertext());
        let revealed = store.get_host_by_name("web1", true).unwrap().unwrap();
        assert_eq!(revealed.credential.secret, Secret::plaintext("rotated"));
    }

    #[test]
    fn test_update_missing_host_is_noop() {
        let (_dir, store) = test_store();
        store
            .update_host("ghost", &HostUpdate::new().ip_address("10.0.0.2"))
            .unwrap();
        assert!(store.get_host_by_name("ghost", false).unwrap().is_none());
    }

    #[test]
    fn test_update_rename_collision() {
        let (_dir, store) = test_store();
        store.add_host(&host("a", "10.0.0.1")).unwrap();
        store.add_host(&host("b", "10.0.0.2")).unwrap();

        let err = store
            .update_host("a", &HostUpdate::new().hostname("b"))
            .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateHostname(ref n) if n == "b"));
    }

    #[test]
    fn test_delete_host_is_idempotent() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        store.delete_host("web1").unwrap();
        store.delete_host("web1").unwrap();
        assert!(store.get_host_by_name("web1", false).unwrap().is_none());
    }

    #[test]
    fn test_group_crud() {
        let (_dir, store) = test_store();
        let group = HostGroup::new("web", "frontend hosts").unwrap();

        store.add_group(&group).unwrap();
        let err = store.add_group(&group).unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateGroup(ref n) if n == "web"));

        store
            .update_group("web", &GroupUpdate::new().description("edge hosts"))
            .unwrap();
        let stored = store.get_group_by_name("web").unwrap().unwrap();
        assert_eq!(stored.description, "edge hosts");

        store.delete_group("web").unwrap();
        store.delete_group("web").unwrap();
        assert!(store.get_groups().unwrap().is_empty());
    }

    #[test]
    fn test_variable_crud() {
        let (_dir, store) = test_store();
        let variable = Variable::new("ansible_user", "deploy").unwrap();

        store.add_variable(&variable).unwrap();
        let err = store.add_variable(&variable).unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateVariable(ref n) if n == "ansible_user"));

        store
            .update_variable("ansible_user", &VariableUpdate::new().value("ops"))
            .unwrap();
        let stored = store.get_variable_by_name("ansible_user").unwrap().unwrap();
        assert_eq!(stored.value, "ops");

        store.delete_variable("ansible_user").unwrap();
        store.delete_variable("ansible_user").unwrap();
        assert!(store.get_variables().unwrap().is_empty());
    }

    #[test]
    fn test_host_and_group_names_do_not_collide() {
        let (_dir, store) = test_store();

        // Separate collections per entity kind: the same name can exist
        // as a host and as a group.
        store.add_host(&host("edge", "10.0.0.1")).unwrap();
        store
            .add_group(&HostGroup::new("edge", "edge nodes").unwrap())
            .unwrap();

        assert!(store.get_host_by_name("edge", false).unwrap().is_some());
        assert!(store.get_group_by_name("edge").unwrap().is_some());
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cipher = CredentialCipher::new(MasterKey::from_bytes(&[1u8; 32]).unwrap());
        let store = InventoryStore::open(dir.path(), cipher);
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        let wrong = CredentialCipher::new(MasterKey::from_bytes(&[2u8; 32]).unwrap());
        let reopened = InventoryStore::open(dir.path(), wrong);

        // Default read returns the stored ciphertext without touching it.
        assert!(reopened.get_host_by_name("web1", false).unwrap().is_some());
        // An explicit decrypt surfaces the failure.
        let err = reopened.get_host_by_name("web1", true).unwrap_err();
        assert!(matches!(err, InventoryError::Cipher(CipherError::DecryptionFailed)));
    }

    #[test]
    fn test_store_level_constraint_backstops_duplicates() {
        let (_dir, store) = test_store();
        store.add_host(&host("web1", "10.0.0.1")).unwrap();

        // Bypass the fast-path check and hit the collection directly, as
        // a racing writer would.
        let doc = store.host_document(&host("web1", "10.0.0.9")).unwrap();
        let err = store.hosts.insert_one(doc).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey { .. }));
    }
}
