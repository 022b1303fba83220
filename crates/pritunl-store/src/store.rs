use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::condition::ConditionSpec;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error persisting collection {collection}: {source}")]
    Io {
        collection: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to (de)serialize document in collection {collection}: {source}")]
    Serde {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque document store gateway.
///
/// A "collection" is a flat namespace of JSON documents keyed by id. The
/// only synchronization primitive callers get is [`DocumentStore::compare_and_set`]:
/// it is the compare-and-set that makes queue lease ownership safe without an
/// in-process lock across runners.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// All documents in the collection, in storage order (no implied
    /// ordering guarantee — callers that need priority order sort the
    /// result themselves).
    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// Atomically applies `patch` (a JSON merge-patch: each top-level key in
    /// `patch` overwrites the corresponding key in the stored document) to
    /// the document at `id` iff `condition` evaluates true against the
    /// document as currently stored. Returns whether the update happened.
    ///
    /// A missing document never matches any condition.
    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        condition: ConditionSpec,
        patch: Value,
    ) -> Result<bool, StoreError>;
}
