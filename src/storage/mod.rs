//! Storage layer for the resource server
//!
//! This module provides the document store abstraction the handlers call.
//! Every operation addresses one named collection; the store owns identifier
//! assignment and nothing above this layer ever invents an id.
//!
//! Update and delete are single filter-by-id calls, so no caller ever needs a
//! find-then-write pair against the same document.

use async_trait::async_trait;

use crate::types::{Document, DocumentId, Fields};

pub use crate::core::error::StoreError;

/// Trait for document storage implementations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `fields` as a new document and return it with its assigned id.
    /// `fields` must not carry an id.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    /// Fetch one document, or `None` if no document has this id
    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// Every document of the collection, in insertion order
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Replace the domain fields of one document in a single step.
    /// Returns the updated document, or `None` if no document has this id.
    async fn replace_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove one document in a single step. Returns whether it existed.
    async fn delete_by_id(&self, collection: &str, id: &DocumentId) -> Result<bool, StoreError>;

    /// Number of documents in the collection
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;
}

/// In-memory store
pub mod mem_store;

/// File-backed store
pub mod file_store;

/// Timeout wrapper for store calls
pub mod bounded;

pub use mem_store::MemStore;
pub use file_store::FileStore;
pub use bounded::bounded;

/// Helper trait that combines all requirements for storage implementations
/// This cleans up generic bounds throughout the codebase
pub trait StorageImpl: DocumentStore + 'static {}

/// Blanket implementation for any type that meets the requirements
impl<T> StorageImpl for T where T: DocumentStore + 'static {}
