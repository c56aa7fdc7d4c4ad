//! File-backed document collection.
//!
//! One JSON file per collection, re-read on every operation so the
//! collection itself holds no cross-call state. Writes go to a temp file
//! and are renamed into place; on Unix the file is restricted to owner
//! read/write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::collection::{Document, DocumentCollection, DocumentError, Filter};

/// Maximum collection file size (1 MiB).
const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// A document collection persisted as a single JSON file.
///
/// The collection enforces uniqueness of its key field on insert and
/// update; that constraint, not any caller-side existence check, is what
/// prevents duplicate keys under concurrent writers.
#[derive(Debug)]
pub struct FileCollection {
    /// Path to the collection file.
    path: PathBuf,
    /// Field whose value must be unique across the collection.
    unique_key: String,
}

impl FileCollection {
    /// Creates a collection backed by the given file.
    ///
    /// The file is created lazily on the first write; a missing file reads
    /// as an empty collection.
    #[must_use]
    pub fn open(path: PathBuf, unique_key: impl Into<String>) -> Self {
        Self {
            path,
            unique_key: unique_key.into(),
        }
    }

    /// Returns the collection file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all documents from the collection file.
    fn load(&self) -> Result<Vec<Document>, DocumentError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(DocumentError::FileTooLarge);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes all documents back, atomically (temp file + rename).
    fn save(&self, docs: &[Document]) -> Result<(), DocumentError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(docs)?;

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!(
            path = %self.path.display(),
            count = docs.len(),
            "collection saved"
        );
        Ok(())
    }

    /// Extracts the unique key value from a document as a string.
    fn key_value(&self, doc: &Document) -> Result<String, DocumentError> {
        match doc.get(&self.unique_key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(DocumentError::MissingKey {
                field: self.unique_key.clone(),
            }),
        }
    }

    /// Checks a candidate key value against existing documents.
    fn check_unique(&self, docs: &[Document], value: &str) -> Result<(), DocumentError> {
        let taken = docs.iter().any(|d| {
            d.get(&self.unique_key)
                .and_then(Value::as_str)
                .is_some_and(|v| v == value)
        });
        if taken {
            return Err(DocumentError::DuplicateKey {
                field: self.unique_key.clone(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

impl DocumentCollection for FileCollection {
    fn find_one(&self, filter: &Filter) -> Result<Option<Document>, DocumentError> {
        let docs = self.load()?;
        Ok(docs.into_iter().find(|d| filter.matches(d)))
    }

    fn find(&self, filter: &Filter) -> Result<Vec<Document>, DocumentError> {
        let docs = self.load()?;
        Ok(docs.into_iter().filter(|d| filter.matches(d)).collect())
    }

    fn insert_one(&self, doc: Document) -> Result<(), DocumentError> {
        let mut docs = self.load()?;

        let key = self.key_value(&doc)?;
        self.check_unique(&docs, &key)?;

        docs.push(doc);
        self.save(&docs)
    }

    fn insert_many(&self, new_docs: Vec<Document>) -> Result<(), DocumentError> {
        if new_docs.is_empty() {
            return Ok(());
        }

        let mut docs = self.load()?;

        // Validate the whole batch (against stored documents and within
        // the batch itself) before writing anything.
        let mut batch_keys = Vec::with_capacity(new_docs.len());
        for doc in &new_docs {
            let key = self.key_value(doc)?;
            self.check_unique(&docs, &key)?;
            if batch_keys.contains(&key) {
                return Err(DocumentError::DuplicateKey {
                    field: self.unique_key.clone(),
                    value: key,
                });
            }
            batch_keys.push(key);
        }

        docs.extend(new_docs);
        self.save(&docs)
    }

    fn update_one(&self, filter: &Filter, changes: Document) -> Result<bool, DocumentError> {
        let mut docs = self.load()?;

        let Some(index) = docs.iter().position(|d| filter.matches(d)) else {
            return Ok(false);
        };

        // A merge that renames the unique key must not collide with
        // another document.
        if let Some(new_key) = changes.get(&self.unique_key).and_then(Value::as_str) {
            let current_key = docs[index]
                .get(&self.unique_key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if new_key != current_key {
                self.check_unique(&docs, new_key)?;
            }
        }

        for (field, value) in changes {
            docs[index].insert(field, value);
        }

        self.save(&docs)?;
        Ok(true)
    }

    fn delete_one(&self, filter: &Filter) -> Result<bool, DocumentError> {
        let mut docs = self.load()?;

        let Some(index) = docs.iter().position(|d| filter.matches(d)) else {
            return Ok(false);
        };

        docs.remove(index);
        self.save(&docs)?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(key: &str, extra: &[(&str, Value)]) -> Document {
        let mut d = Document::new();
        d.insert("name".to_string(), json!(key));
        for (k, v) in extra {
            d.insert((*k).to_string(), v.clone());
        }
        d
    }

    fn temp_collection() -> (tempfile::TempDir, FileCollection) {
        let dir = tempfile::tempdir().unwrap();
        let collection = FileCollection::open(dir.path().join("items.json"), "name");
        (dir, collection)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, collection) = temp_collection();
        assert!(collection.find(&Filter::all()).unwrap().is_empty());
        assert!(collection.find_one(&Filter::by("name", "a")).unwrap().is_none());
    }

    #[test]
    fn test_insert_and_find() {
        let (_dir, collection) = temp_collection();

        collection.insert_one(doc("a", &[("v", json!(1))])).unwrap();
        collection.insert_one(doc("b", &[("v", json!(2))])).unwrap();

        let found = collection.find_one(&Filter::by("name", "b")).unwrap().unwrap();
        assert_eq!(found.get("v"), Some(&json!(2)));
        assert_eq!(collection.find(&Filter::all()).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_rejects_duplicate_key() {
        let (_dir, collection) = temp_collection();

        collection.insert_one(doc("a", &[])).unwrap();
        let err = collection.insert_one(doc("a", &[])).unwrap_err();

        assert!(matches!(
            err,
            DocumentError::DuplicateKey { ref field, ref value }
                if field == "name" && value == "a"
        ));
        // The stored document is untouched.
        assert_eq!(collection.find(&Filter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_rejects_missing_key() {
        let (_dir, collection) = temp_collection();

        let mut d = Document::new();
        d.insert("other".to_string(), json!("x"));
        assert!(matches!(
            collection.insert_one(d),
            Err(DocumentError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_insert_many_is_all_or_nothing() {
        let (_dir, collection) = temp_collection();
        collection.insert_one(doc("a", &[])).unwrap();

        // Batch contains a conflict with stored data: nothing is written.
        let err = collection
            .insert_many(vec![doc("b", &[]), doc("a", &[])])
            .unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey { .. }));
        assert_eq!(collection.find(&Filter::all()).unwrap().len(), 1);

        // Batch with an internal conflict is rejected the same way.
        let err = collection
            .insert_many(vec![doc("c", &[]), doc("c", &[])])
            .unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey { .. }));
        assert_eq!(collection.find(&Filter::all()).unwrap().len(), 1);
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let (_dir, collection) = temp_collection();
        collection
            .insert_one(doc("a", &[("v", json!(1)), ("w", json!("keep"))]))
            .unwrap();

        let mut changes = Document::new();
        changes.insert("v".to_string(), json!(2));
        let updated = collection
            .update_one(&Filter::by("name", "a"), changes)
            .unwrap();
        assert!(updated);

        let d = collection.find_one(&Filter::by("name", "a")).unwrap().unwrap();
        assert_eq!(d.get("v"), Some(&json!(2)));
        assert_eq!(d.get("w"), Some(&json!("keep")));
    }

    #[test]
    fn test_update_miss_is_noop() {
        let (_dir, collection) = temp_collection();
        let updated = collection
            .update_one(&Filter::by("name", "ghost"), Document::new())
            .unwrap();
        assert!(!updated);
    }

    #[test]
    fn test_update_rejects_key_collision() {
        let (_dir, collection) = temp_collection();
        collection.insert_one(doc("a", &[])).unwrap();
        collection.insert_one(doc("b", &[])).unwrap();

        let mut changes = Document::new();
        changes.insert("name".to_string(), json!("b"));
        let err = collection
            .update_one(&Filter::by("name", "a"), changes)
            .unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey { .. }));
    }

    #[test]
    fn test_update_same_key_value_is_allowed() {
        let (_dir, collection) = temp_collection();
        collection.insert_one(doc("a", &[("v", json!(1))])).unwrap();

        let mut changes = Document::new();
        changes.insert("name".to_string(), json!("a"));
        changes.insert("v".to_string(), json!(2));
        assert!(collection.update_one(&Filter::by("name", "a"), changes).unwrap());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, collection) = temp_collection();
        collection.insert_one(doc("a", &[])).unwrap();

        assert!(collection.delete_one(&Filter::by("name", "a")).unwrap());
        assert!(!collection.delete_one(&Filter::by("name", "a")).unwrap());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");

        let collection = FileCollection::open(path.clone(), "name");
        collection.insert_one(doc("a", &[])).unwrap();

        let reopened = FileCollection::open(path, "name");
        assert_eq!(reopened.find(&Filter::all()).unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_restricted() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, collection) = temp_collection();
        collection.insert_one(doc("a", &[])).unwrap();

        let mode = fs::metadata(collection.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
