//! Document-store contract.
//!
//! The inventory persists its entities through this interface: named
//! collections of JSON documents, addressed by equality filters over
//! top-level fields. Every collection declares one unique key field and
//! must reject inserts and updates that would violate it. Application
//! code treats its own duplicate checks as a fast path only.

use std::io;

use serde_json::Value;
use thiserror::Error;

/// A loosely structured document: a JSON object's field map.
pub type Document = serde_json::Map<String, Value>;

/// Errors from document-store operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Document (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Collection file exceeds the size cap.
    #[error("collection file too large")]
    FileTooLarge,

    /// A document is missing the collection's unique key field.
    #[error("document is missing unique key field '{field}'")]
    MissingKey {
        /// The unique key field name.
        field: String,
    },

    /// Inserting or updating would store two documents with the same
    /// unique key value.
    #[error("duplicate value '{value}' for unique key '{field}'")]
    DuplicateKey {
        /// The unique key field name.
        field: String,
        /// The colliding value.
        value: String,
    },
}

/// Equality filter over one or more top-level document fields.
///
/// An empty filter matches every document.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    fields: Vec<(String, Value)>,
}

impl Filter {
    /// Matches all documents.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches documents whose `field` equals `value`.
    #[must_use]
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            fields: vec![(field.into(), value.into())],
        }
    }

    /// Adds another field equality condition.
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }

    /// Returns true if the document satisfies every condition.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.fields
            .iter()
            .all(|(field, value)| doc.get(field) == Some(value))
    }
}

/// A named collection of documents with a unique key constraint.
pub trait DocumentCollection {
    /// Returns the first document matching the filter.
    ///
    /// # Errors
    /// Returns `DocumentError` on storage failure.
    fn find_one(&self, filter: &Filter) -> Result<Option<Document>, DocumentError>;

    /// Returns all documents matching the filter, in store iteration order.
    ///
    /// # Errors
    /// Returns `DocumentError` on storage failure.
    fn find(&self, filter: &Filter) -> Result<Vec<Document>, DocumentError>;

    /// Inserts one document.
    ///
    /// # Errors
    /// Returns `DocumentError::DuplicateKey` if a stored document already
    /// holds the same unique key value, `DocumentError::MissingKey` if the
    /// document lacks the key field.
    fn insert_one(&self, doc: Document) -> Result<(), DocumentError>;

    /// Inserts a batch of documents.
    ///
    /// The batch is validated as a whole before anything is written: on a
    /// unique key conflict (against stored documents or within the batch)
    /// nothing is inserted.
    ///
    /// # Errors
    /// Same conditions as [`Self::insert_one`].
    fn insert_many(&self, docs: Vec<Document>) -> Result<(), DocumentError>;

    /// Merges `changes` into the first document matching the filter.
    ///
    /// Only top-level fields named in `changes` are touched. Returns true
    /// if a document was updated, false if none matched (not an error).
    ///
    /// # Errors
    /// Returns `DocumentError::DuplicateKey` if the merge would change the
    /// unique key to a value another document already holds.
    fn update_one(&self, filter: &Filter, changes: Document) -> Result<bool, DocumentError>;

    /// Removes the first document matching the filter.
    ///
    /// Returns true if a document was removed, false if none matched (not
    /// an error).
    ///
    /// # Errors
    /// Returns `DocumentError` on storage failure.
    fn delete_one(&self, filter: &Filter) -> Result<bool, DocumentError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_filter_single_field() {
        let d = doc(&[("hostname", json!("web1")), ("port", json!(22))]);

        assert!(Filter::by("hostname", "web1").matches(&d));
        assert!(!Filter::by("hostname", "web2").matches(&d));
        assert!(!Filter::by("missing", "web1").matches(&d));
    }

    #[test]
    fn test_filter_multiple_fields() {
        let d = doc(&[("hostname", json!("web1")), ("port", json!(22))]);

        assert!(Filter::by("hostname", "web1").and("port", 22).matches(&d));
        assert!(!Filter::by("hostname", "web1").and("port", 2222).matches(&d));
    }

    #[test]
    fn test_filter_all_matches_everything() {
        assert!(Filter::all().matches(&doc(&[("x", json!(1))])));
        assert!(Filter::all().matches(&Document::new()));
    }
}
