//! The queue engine: enqueue, claim, execute, complete.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use pritunl_core::{Clock, QueueId, SystemClock};
use pritunl_store::{ConditionSpec, DocumentStore, Messenger};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::document::{Priority, QueueDocument, QueueState};
use crate::error::QueueError;
use crate::executor::ExecutorRegistry;

const COLLECTION: &str = "queue";
const QUEUE_UPDATE_CHANNEL: &str = "queue";
const QUEUE_UPDATE_MESSAGE: &str = "queue_update";

/// Outcome of a single [`QueueEngine::run_once`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The document ran to completion (committed+post_task, or
    /// rolled-back+rollback_task) and has been removed.
    Done,
    /// Another runner held an unexpired lease, or the document had already
    /// been removed; this attempt did nothing.
    Skipped,
}

pub struct QueueEngine {
    store: Arc<dyn DocumentStore>,
    messenger: Arc<Messenger>,
    registry: ExecutorRegistry,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn DocumentStore>, messenger: Arc<Messenger>, registry: ExecutorRegistry, config: QueueConfig) -> Self {
        Self {
            store,
            messenger,
            registry,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persists a new `PENDING` document and wakes any sleeping scanner.
    pub async fn enqueue(
        &self,
        queue_type: impl Into<String>,
        priority: Priority,
        ttl_seconds: Option<u64>,
        payload: Value,
    ) -> Result<QueueId, QueueError> {
        let doc = QueueDocument::new(
            queue_type,
            priority,
            ttl_seconds.unwrap_or(self.config.default_ttl_seconds),
            payload,
        );
        let id = doc.id.clone();

        self.store
            .insert(COLLECTION, id.as_str(), doc.to_value())
            .await
            .map_err(|source| QueueError::Store { id: id.clone(), source })?;

        self.messenger.publish(QUEUE_UPDATE_CHANNEL, QUEUE_UPDATE_MESSAGE);
        Ok(id)
    }

    /// Enumerates all documents, ascending by priority (ties broken in
    /// arbitrary, unspecified order — scanners must not assume FIFO), and
    /// attempts [`Self::run_once`] on each.
    pub async fn scan(&self) -> Result<(), QueueError> {
        let mut docs = Vec::new();
        for value in self
            .store
            .scan(COLLECTION)
            .await
            .map_err(|source| QueueError::Store { id: QueueId::new("<scan>"), source })?
        {
            match QueueDocument::from_value(value) {
                Ok(doc) => docs.push(doc),
                Err(source) => warn!(error = %source, "skipping malformed queue document"),
            }
        }

        docs.sort_by_key(|d| d.priority);

        for doc in docs {
            let id = doc.id.clone();
            if let Err(err) = self.run_once(doc).await {
                warn!(queue_id = %id, error = %err, "queue run_once failed");
            }
        }

        Ok(())
    }

    /// Blocks until a `queue_update` notification arrives or
    /// `poll_interval_seconds` elapses, whichever comes first — the
    /// scanner's wake condition. Always returns; callers loop on it.
    pub async fn subscribe(&self) {
        let mut rx = self.messenger.subscribe(QUEUE_UPDATE_CHANNEL);
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds.max(1));

        tokio::select! {
            _ = rx.recv() => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    /// Runs the claim/execute/complete protocol on one document exactly
    /// once. See §4.1 of the design document for the full state machine;
    /// this function is its direct transcription.
    pub async fn run_once(&self, doc: QueueDocument) -> Result<RunOutcome, QueueError> {
        let id = doc.id.clone();
        let runner_id = uuid::Uuid::new_v4().to_string();

        if !self.claim(&id, &runner_id, doc.ttl_seconds).await? {
            return Ok(RunOutcome::Skipped);
        }

        let Some(mut doc) = self.reload(&id).await? else {
            return Ok(RunOutcome::Skipped);
        };

        if doc.state == QueueState::Pending {
            doc.attempts += 1;

            if doc.attempts > self.config.max_attempts {
                self.patch(&id, serde_json::json!({"state": QueueState::Rollback, "attempts": doc.attempts})).await?;
                doc.state = QueueState::Rollback;
            } else {
                self.patch(&id, serde_json::json!({"attempts": doc.attempts})).await?;

                let executor = self.registry.resolve(&doc.queue_type).ok_or_else(|| QueueError::UnknownQueueType {
                    id: id.clone(),
                    queue_type: doc.queue_type.clone(),
                })?;

                if let Err(err) = executor.task(&doc.payload).await {
                    warn!(queue_id = %id, queue_type = %doc.queue_type, attempts = doc.attempts, error = %err.0, "task phase failed; leaving for retry");
                    return Ok(RunOutcome::Skipped);
                }

                self.patch(&id, serde_json::json!({"state": QueueState::Committed})).await?;
                doc.state = QueueState::Committed;
            }
        }

        if !self.claim(&id, &runner_id, doc.ttl_seconds).await? {
            debug!(queue_id = %id, "lease lost before post/rollback phase; yielding to new owner");
            return Ok(RunOutcome::Skipped);
        }

        let executor = self.registry.resolve(&doc.queue_type).ok_or_else(|| QueueError::UnknownQueueType {
            id: id.clone(),
            queue_type: doc.queue_type.clone(),
        })?;

        let phase_result = match doc.state {
            QueueState::Committed => executor.post_task(&doc.payload).await,
            QueueState::Rollback => executor.rollback_task(&doc.payload).await,
            QueueState::Pending => Ok(()),
        };

        if let Err(err) = phase_result {
            warn!(queue_id = %id, queue_type = %doc.queue_type, error = %err.0, "post/rollback phase failed; completing anyway");
        }

        self.complete(&id).await?;
        Ok(RunOutcome::Done)
    }

    /// The claim step, run both before `task()` (Claim A) and before
    /// post/rollback (Claim B). Widened per the resolved open question in
    /// §4.1: an expired lease is claimable by anyone regardless of the
    /// stored `runner_id`.
    async fn claim(&self, id: &QueueId, runner_id: &str, ttl_seconds: u64) -> Result<bool, QueueError> {
        let now = self.clock.now();
        let ttl_timestamp = now + ChronoDuration::seconds(ttl_seconds as i64);

        let condition = ConditionSpec::Or(vec![
            ConditionSpec::FieldAbsent("runner_id".into()),
            ConditionSpec::FieldEquals("runner_id".into(), Value::String(runner_id.to_string())),
            ConditionSpec::FieldLessThan("ttl_timestamp".into(), Value::String(now.to_rfc3339())),
        ]);

        self.store
            .compare_and_set(
                COLLECTION,
                id.as_str(),
                condition,
                serde_json::json!({
                    "runner_id": runner_id,
                    "ttl_timestamp": ttl_timestamp.to_rfc3339(),
                }),
            )
            .await
            .map_err(|source| QueueError::Store { id: id.clone(), source })
    }

    async fn reload(&self, id: &QueueId) -> Result<Option<QueueDocument>, QueueError> {
        let value = self
            .store
            .get(COLLECTION, id.as_str())
            .await
            .map_err(|source| QueueError::Store { id: id.clone(), source })?;

        value
            .map(QueueDocument::from_value)
            .transpose()
            .map_err(|source| QueueError::Decode { id: id.clone(), source })
    }

    async fn patch(&self, id: &QueueId, patch: Value) -> Result<(), QueueError> {
        self.store
            .compare_and_set(COLLECTION, id.as_str(), ConditionSpec::Any, patch)
            .await
            .map_err(|source| QueueError::Store { id: id.clone(), source })?;
        Ok(())
    }

    async fn complete(&self, id: &QueueId) -> Result<(), QueueError> {
        self.store
            .remove(COLLECTION, id.as_str())
            .await
            .map_err(|source| QueueError::Store { id: id.clone(), source })
    }
}
