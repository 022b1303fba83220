//! File-backed `DocumentStore`.
//!
//! Collections live in memory behind a single mutex (so `compare_and_set` is
//! trivially atomic) and are mirrored to a JSON snapshot file on every
//! mutation using the same write-to-temp-then-rename pattern the reference
//! implementation's `KeeperState::save` uses for its own state file: never
//! truncate the real path in place, always write the replacement next to it
//! and atomically rename over.
//!
//! This is the crate's only `DocumentStore` implementation. Swapping in a
//! real database later means implementing the trait again; nothing above
//! this module would need to change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::condition::ConditionSpec;
use crate::store::{DocumentStore, StoreError};

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

pub struct FileDocumentStore {
    snapshot_path: PathBuf,
    collections: Mutex<Collections>,
}

impl FileDocumentStore {
    /// Loads `snapshot_path` if it exists, otherwise starts empty. The
    /// parent directory is created eagerly so the first save doesn't fail.
    pub fn open(snapshot_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let snapshot_path = snapshot_path.as_ref().to_path_buf();

        if let Some(parent) = snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    collection: "<init>".into(),
                    source,
                })?;
            }
        }

        let collections = if snapshot_path.exists() {
            let raw = std::fs::read_to_string(&snapshot_path).map_err(|source| StoreError::Io {
                collection: "<init>".into(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| StoreError::Serde {
                collection: "<init>".into(),
                source,
            })?
        } else {
            Collections::new()
        };

        Ok(Self {
            snapshot_path,
            collections: Mutex::new(collections),
        })
    }

    /// In-memory only, for tests that don't want to touch the filesystem.
    pub fn in_memory() -> Self {
        Self {
            snapshot_path: PathBuf::new(),
            collections: Mutex::new(Collections::new()),
        }
    }

    fn save(&self, collections: &Collections) -> Result<(), StoreError> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Ok(());
        }

        let json = serde_json::to_string_pretty(collections).map_err(|source| StoreError::Serde {
            collection: "<snapshot>".into(),
            source,
        })?;

        let tmp_path = self.snapshot_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(|source| StoreError::Io {
            collection: "<snapshot>".into(),
            source,
        })?;

        rename_replacing(&tmp_path, &self.snapshot_path).map_err(|source| StoreError::Io {
            collection: "<snapshot>".into(),
            source,
        })
    }
}

fn rename_replacing(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if cfg!(windows) => {
            let _ = std::fs::remove_file(to);
            std::fs::rename(from, to).map_err(|_| err)
        }
        Err(err) => Err(err),
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        self.save(&collections)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        if let Some(c) = collections.get_mut(collection) {
            c.remove(id);
        }
        self.save(&collections)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        condition: ConditionSpec,
        patch: Value,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.lock().await;
        let Some(c) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = c.get_mut(id) else {
            return Ok(false);
        };

        if !condition.evaluate(doc) {
            return Ok(false);
        }

        merge_patch(doc, &patch);
        self.save(&collections)?;
        Ok(true)
    }
}

fn merge_patch(doc: &mut Value, patch: &Value) {
    let (Value::Object(doc_map), Value::Object(patch_map)) = (doc, patch) else {
        return;
    };
    for (key, value) in patch_map {
        doc_map.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = FileDocumentStore::in_memory();
        store
            .insert("queue", "q1", json!({"state": "PENDING"}))
            .await
            .unwrap();
        let doc = store.get("queue", "q1").await.unwrap();
        assert_eq!(doc, Some(json!({"state": "PENDING"})));
    }

    #[tokio::test]
    async fn compare_and_set_respects_condition() {
        let store = FileDocumentStore::in_memory();
        store
            .insert("queue", "q1", json!({"runner_id": "r1"}))
            .await
            .unwrap();

        let applied = store
            .compare_and_set(
                "queue",
                "q1",
                ConditionSpec::FieldEquals("runner_id".into(), json!("r2")),
                json!({"state": "COMMITTED"}),
            )
            .await
            .unwrap();
        assert!(!applied);

        let applied = store
            .compare_and_set(
                "queue",
                "q1",
                ConditionSpec::FieldEquals("runner_id".into(), json!("r1")),
                json!({"state": "COMMITTED"}),
            )
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(
            store.get("queue", "q1").await.unwrap().unwrap()["state"],
            json!("COMMITTED")
        );
    }

    #[tokio::test]
    async fn snapshot_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        {
            let store = FileDocumentStore::open(&path).unwrap();
            store
                .insert("queue", "q1", json!({"state": "PENDING"}))
                .await
                .unwrap();
        }

        let reopened = FileDocumentStore::open(&path).unwrap();
        let doc = reopened.get("queue", "q1").await.unwrap();
        assert_eq!(doc, Some(json!({"state": "PENDING"})));
    }
}
