//! File-backed document store
//!
//! Reads are served from an in-memory [`MemStore`]. Every write to a
//! collection is applied in memory and then the whole collection is written
//! to `<data_dir>/<collection>.json` through a temp file and a rename, so the
//! file on disk is always a complete snapshot. Writes to one collection are
//! serialized by a per-collection async mutex; a failed flush rolls the
//! in-memory change back before the error is returned.
//!
//! Each write runs on its own task. A caller that stops waiting (a timeout,
//! a dropped connection) does not cancel it, so memory and disk never
//! disagree about a write that was started.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::config::is_path_safe;
use crate::storage::{DocumentStore, MemStore, StoreError};
use crate::types::{Document, DocumentId, Fields};
use crate::{log_debug, log_error, log_info};

/// Key holding the document id in collection files
const ID_KEY: &str = "_id";

/// On-disk shape of one document
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(rename = "_id")]
    id: DocumentId,
    #[serde(flatten)]
    fields: Fields,
}

/// Memory store mirrored to one JSON file per collection
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

#[derive(Debug)]
struct FileStoreInner {
    data_dir: PathBuf,
    memory: MemStore,
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileStore {
    /// Open (creating if needed) `data_dir` and load every collection file in it
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;

        let memory = MemStore::new();
        let mut entries = tokio::fs::read_dir(&data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(collection) = collection_name(&path) else {
                continue;
            };

            let bytes = tokio::fs::read(&path).await?;
            let records: Vec<StoredRecord> = serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Corruption(format!("{}: {}", path.display(), e))
            })?;
            let count = records.len();
            memory.restore(
                &collection,
                records
                    .into_iter()
                    .map(|r| Document::new(r.id, r.fields))
                    .collect(),
            )?;
            log_info!("Loaded {} documents into '{}' from {}", count, collection, path.display());
        }

        Ok(Self {
            inner: Arc::new(FileStoreInner {
                data_dir,
                memory,
                write_locks: DashMap::new(),
            }),
        })
    }

    /// Directory holding the collection files
    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }
}

impl FileStoreInner {
    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection))
    }

    fn write_lock(&self, collection: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(collection.to_string())
            .or_default()
            .value()
            .clone()
    }

    async fn flush(&self, collection: &str) -> Result<(), StoreError> {
        let records: Vec<StoredRecord> = self
            .memory
            .snapshot(collection)
            .into_iter()
            .map(|doc| StoredRecord {
                id: doc.id,
                fields: doc.fields,
            })
            .collect();
        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| StoreError::Corruption(format!("cannot encode {}: {}", collection, e)))?;

        let target = self.collection_path(collection);
        let tmp = self.data_dir.join(format!(".{}.json.tmp", collection));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &target).await?;
        log_debug!("Flushed {} documents to {}", records.len(), target.display());
        Ok(())
    }

    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let lock = self.write_lock(collection);
        let _guard = lock.lock().await;

        let doc = self.memory.insert(collection, fields).await?;
        if let Err(e) = self.flush(collection).await {
            log_error!("Rolling back insert into {}: {}", collection, e);
            self.memory.delete_by_id(collection, &doc.id).await?;
            return Err(e);
        }
        Ok(doc)
    }

    async fn replace_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError> {
        let lock = self.write_lock(collection);
        let _guard = lock.lock().await;

        let Some(previous) = self.memory.find_by_id(collection, id).await? else {
            return Ok(None);
        };
        let updated = self.memory.replace_by_id(collection, id, fields).await?;
        if let Err(e) = self.flush(collection).await {
            log_error!("Rolling back replace of {}/{}: {}", collection, id, e);
            self.memory
                .replace_by_id(collection, id, previous.fields)
                .await?;
            return Err(e);
        }
        Ok(updated)
    }

    async fn delete_by_id(&self, collection: &str, id: &DocumentId) -> Result<bool, StoreError> {
        let lock = self.write_lock(collection);
        let _guard = lock.lock().await;

        let Some(previous) = self.memory.find_by_id(collection, id).await? else {
            return Ok(false);
        };
        self.memory.delete_by_id(collection, id).await?;
        if let Err(e) = self.flush(collection).await {
            // The restored document moves to the end of the listing order.
            log_error!("Rolling back delete of {}/{}: {}", collection, id, e);
            self.memory.restore(collection, vec![previous])?;
            return Err(e);
        }
        Ok(true)
    }
}

/// `<name>.json` with a path-safe name; anything else in the directory is ignored
fn collection_name(path: &Path) -> Option<String> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    is_path_safe(stem).then(|| stem.to_string())
}

fn check_collection(collection: &str) -> Result<(), StoreError> {
    if is_path_safe(collection) {
        Ok(())
    } else {
        Err(StoreError::Constraint(format!(
            "collection name '{}' is not usable as a file name",
            collection
        )))
    }
}

/// A field named like the on-disk id key would be written twice and break the file
fn check_fields(fields: &Fields) -> Result<(), StoreError> {
    if fields.contains_key(ID_KEY) {
        Err(StoreError::Constraint(format!(
            "field '{}' is reserved for the document id",
            ID_KEY
        )))
    } else {
        Ok(())
    }
}

/// Run a write on its own task so it finishes even if the caller goes away
async fn run_to_completion<T, F>(write: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    tokio::spawn(write)
        .await
        .map_err(|e| StoreError::Unavailable(format!("write task failed: {}", e)))?
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn insert(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        check_collection(collection)?;
        check_fields(&fields)?;
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        run_to_completion(async move { inner.insert(&collection, fields).await }).await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.memory.find_by_id(collection, id).await
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.inner.memory.find_all(collection).await
    }

    async fn replace_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError> {
        check_collection(collection)?;
        check_fields(&fields)?;
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let id = *id;
        run_to_completion(async move { inner.replace_by_id(&collection, &id, fields).await }).await
    }

    async fn delete_by_id(&self, collection: &str, id: &DocumentId) -> Result<bool, StoreError> {
        check_collection(collection)?;
        let inner = Arc::clone(&self.inner);
        let collection = collection.to_string();
        let id = *id;
        run_to_completion(async move { inner.delete_by_id(&collection, &id).await }).await
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.inner.memory.count(collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn records_on_disk(dir: &Path, collection: &str) -> Option<Vec<serde_json::Value>> {
        let raw = std::fs::read_to_string(dir.join(format!("{}.json", collection))).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Makes every later flush of `collection` fail at the temp file write
    fn block_flushes(dir: &Path, collection: &str) {
        std::fs::create_dir(dir.join(format!(".{}.json.tmp", collection))).unwrap();
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let (kept, removed, edited) = {
            let store = FileStore::open(dir.path()).await.unwrap();
            let kept = store.insert("books", fields(json!({"title": "Dune"}))).await.unwrap();
            let removed = store.insert("books", fields(json!({"title": "Emma"}))).await.unwrap();
            let edited = store.insert("books", fields(json!({"title": "Ulysses"}))).await.unwrap();
            assert!(store.delete_by_id("books", &removed.id).await.unwrap());
            store
                .replace_by_id(
                    "books",
                    &edited.id,
                    fields(json!({"title": "Ulysses", "author": "Joyce"})),
                )
                .await
                .unwrap()
                .unwrap();
            (kept, removed, edited)
        };

        let reopened = FileStore::open(dir.path()).await.unwrap();
        let listed = reopened.find_all("books").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], kept);
        assert_eq!(listed[1].id, edited.id);
        assert_eq!(listed[1].get("author"), Some(&json!("Joyce")));
        assert!(reopened.find_by_id("books", &removed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_layout_uses_underscore_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let doc = store.insert("todos", fields(json!({"text": "walk"}))).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("todos.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, json!([{"_id": doc.id.to_string(), "text": "walk"}]));
        assert!(!dir.path().join(".todos.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_collection_file_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("todos.json"), b"{not json").unwrap();

        let result = FileStore::open(dir.path()).await;
        assert!(matches!(result, Err(StoreError::Corruption(_))));
    }

    #[tokio::test]
    async fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("bad name.json"), b"[]").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.count("notes").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_unsafe_collection_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let result = store.insert("../escape", Fields::new()).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_underscore_id_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let doc = store.insert("todos", fields(json!({"text": "walk"}))).await.unwrap();

        let result = store
            .insert("todos", fields(json!({"_id": "client-sent", "text": "x"})))
            .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
        let result = store
            .replace_by_id("todos", &doc.id, fields(json!({"_id": "client-sent"})))
            .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.find_all("todos").await.unwrap(), vec![doc]);
    }

    #[tokio::test]
    async fn test_abandoned_write_still_reaches_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        let write = store.insert("todos", fields(json!({"text": "walk"})));
        let _ = tokio::time::timeout(std::time::Duration::ZERO, write).await;

        let mut on_disk = None;
        for _ in 0..200 {
            on_disk = records_on_disk(dir.path(), "todos");
            if on_disk.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let on_disk = on_disk.expect("write never reached disk");
        assert_eq!(on_disk.len(), 1);
        assert_eq!(store.count("todos").await.unwrap(), on_disk.len());
    }

    #[tokio::test]
    async fn test_failed_insert_flush_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let kept = store.insert("todos", fields(json!({"text": "walk"}))).await.unwrap();
        block_flushes(dir.path(), "todos");

        let result = store.insert("todos", fields(json!({"text": "swim"}))).await;
        assert!(matches!(result, Err(StoreError::DiskIo(_))));
        assert_eq!(store.find_all("todos").await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_failed_replace_flush_keeps_previous_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let doc = store.insert("todos", fields(json!({"text": "walk"}))).await.unwrap();
        block_flushes(dir.path(), "todos");

        let result = store
            .replace_by_id("todos", &doc.id, fields(json!({"text": "run"})))
            .await;
        assert!(matches!(result, Err(StoreError::DiskIo(_))));
        assert_eq!(store.find_by_id("todos", &doc.id).await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn test_failed_delete_flush_keeps_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let doc = store.insert("todos", fields(json!({"text": "walk"}))).await.unwrap();
        block_flushes(dir.path(), "todos");

        let result = store.delete_by_id("todos", &doc.id).await;
        assert!(matches!(result, Err(StoreError::DiskIo(_))));
        assert_eq!(store.find_by_id("todos", &doc.id).await.unwrap(), Some(doc));
        assert_eq!(store.count("todos").await.unwrap(), 1);
        assert_eq!(records_on_disk(dir.path(), "todos").map(|r| r.len()), Some(1));
    }
}
