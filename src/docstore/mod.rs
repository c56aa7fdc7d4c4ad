//! Document-oriented persistence layer.
//!
//! - [`DocumentCollection`]: the abstract store contract the inventory
//!   depends on
//! - [`FileCollection`]: JSON-file-backed implementation with atomic
//!   writes and a unique key constraint

pub mod collection;
pub mod file;

pub use collection::{Document, DocumentCollection, DocumentError, Filter};
pub use file::FileCollection;
