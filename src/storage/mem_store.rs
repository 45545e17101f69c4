//! Simple in-memory storage implementation using DashMap
//!
//! Documents are kept as JSON field maps, one DashMap per collection. Each
//! entry carries the sequence number it was inserted with so listings come
//! back in insertion order, and replace keeps the original sequence number.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::storage::{DocumentStore, StoreError};
use crate::types::{Document, DocumentId, Fields};
use crate::{log_debug, log_error};

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    fields: Fields,
}

/// One named collection
#[derive(Debug, Default)]
struct Collection {
    /// Map of document id to stored fields
    docs: DashMap<DocumentId, Entry>,
    /// Counter for insertion order
    next_seq: AtomicU64,
}

impl Collection {
    fn put(&self, id: DocumentId, fields: Fields) -> Result<(), StoreError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        match self.docs.entry(id) {
            MapEntry::Occupied(_) => Err(StoreError::Constraint(format!(
                "duplicate document id {}",
                id
            ))),
            MapEntry::Vacant(slot) => {
                slot.insert(Entry { seq, fields });
                Ok(())
            }
        }
    }

    fn ordered(&self) -> Vec<Document> {
        let mut entries: Vec<(u64, Document)> = self
            .docs
            .iter()
            .map(|e| (e.seq, Document::new(*e.key(), e.fields.clone())))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, doc)| doc).collect()
    }
}

/// Simple storage implementation using DashMap and JSON
#[derive(Debug, Default)]
pub struct MemStore {
    /// Map of collection name to its documents
    collections: DashMap<String, Arc<Collection>>,
}

impl MemStore {
    /// Create a new, empty MemStore
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.get(name).map(|c| c.value().clone())
    }

    fn collection_or_create(&self, name: &str) -> Arc<Collection> {
        self.collections
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Names of every collection that has held a document
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|c| c.key().clone()).collect();
        names.sort();
        names
    }

    /// Copy of a collection in insertion order
    pub fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collection(collection)
            .map(|c| c.ordered())
            .unwrap_or_default()
    }

    /// Bulk-load documents that already carry ids, preserving their order
    pub fn restore(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        let target = self.collection_or_create(collection);
        for doc in documents {
            target.put(doc.id, doc.fields)?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemStore {
    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let id = DocumentId::generate();
        self.collection_or_create(collection)
            .put(id, fields.clone())
            .inspect_err(|e| log_error!("MemStore::insert into {} failed: {}", collection, e))?;
        log_debug!("MemStore::insert - {}/{}", collection, id);
        Ok(Document::new(id, fields))
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self.collection(collection).and_then(|c| {
            c.docs
                .get(id)
                .map(|entry| Document::new(*id, entry.fields.clone()))
        }))
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self.snapshot(collection))
    }

    async fn replace_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError> {
        let Some(target) = self.collection(collection) else {
            return Ok(None);
        };
        let replaced = target.docs.get_mut(id).map(|mut entry| {
            entry.fields = fields;
            Document::new(*id, entry.fields.clone())
        });
        Ok(replaced)
    }

    async fn delete_by_id(&self, collection: &str, id: &DocumentId) -> Result<bool, StoreError> {
        Ok(self
            .collection(collection)
            .map(|c| c.docs.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.collection(collection).map(|c| c.docs.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_round_trips() {
        let store = MemStore::new();
        let created = store
            .insert("todos", fields(json!({"text": "wash dishes", "done": false})))
            .await
            .unwrap();

        let fetched = store.find_by_id("todos", &created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(!fetched.fields.contains_key("id"));
    }

    #[tokio::test]
    async fn test_find_all_keeps_insertion_order() {
        let store = MemStore::new();
        let mut ids = Vec::new();
        for n in 0..50 {
            ids.push(store.insert("todos", fields(json!({"order": n}))).await.unwrap().id);
        }

        let listed: Vec<DocumentId> = store
            .find_all("todos")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_replace_overwrites_all_fields_and_keeps_position() {
        let store = MemStore::new();
        let first = store.insert("todos", fields(json!({"a": 1, "b": 2}))).await.unwrap();
        let second = store.insert("todos", fields(json!({"a": 3}))).await.unwrap();

        let updated = store
            .replace_by_id("todos", &first.id, fields(json!({"a": 9})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.fields, fields(json!({"a": 9})));

        let listed = store.find_all("todos").await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert!(listed[0].get("b").is_none());
    }

    #[tokio::test]
    async fn test_missing_ids_and_collections() {
        let store = MemStore::new();
        let ghost = DocumentId::generate();

        assert!(store.find_by_id("todos", &ghost).await.unwrap().is_none());
        assert!(store.replace_by_id("todos", &ghost, Fields::new()).await.unwrap().is_none());
        assert!(!store.delete_by_id("todos", &ghost).await.unwrap());
        assert!(store.find_all("todos").await.unwrap().is_empty());
        assert_eq!(store.count("todos").await.unwrap(), 0);
        assert!(store.collection_names().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let store = MemStore::new();
        let doc = store.insert("books", fields(json!({"title": "Dune"}))).await.unwrap();

        assert!(store.delete_by_id("books", &doc.id).await.unwrap());
        assert!(!store.delete_by_id("books", &doc.id).await.unwrap());
        assert!(store.find_by_id("books", &doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemStore::new();
        let book = store.insert("books", fields(json!({"title": "Dune"}))).await.unwrap();

        assert!(store.find_by_id("todos", &book.id).await.unwrap().is_none());
        assert_eq!(store.count("books").await.unwrap(), 1);
        assert_eq!(store.collection_names(), vec!["books".to_string()]);
    }

    #[tokio::test]
    async fn test_restore_rejects_duplicate_ids() {
        let store = MemStore::new();
        let id = DocumentId::generate();
        let docs = vec![Document::new(id, Fields::new()), Document::new(id, Fields::new())];

        assert!(matches!(store.restore("todos", docs), Err(StoreError::Constraint(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replaces_never_lose_the_document() {
        let store = Arc::new(MemStore::new());
        let doc = store.insert("todos", fields(json!({"n": 0}))).await.unwrap();

        let mut handles = Vec::new();
        for n in 1..=32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .replace_by_id("todos", &doc.id, fields(json!({"n": n})))
                    .await
                    .unwrap()
                    .is_some()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let last = store.find_by_id("todos", &doc.id).await.unwrap().unwrap();
        assert_eq!(last.fields.len(), 1);
        assert_eq!(store.count("todos").await.unwrap(), 1);
    }
}
