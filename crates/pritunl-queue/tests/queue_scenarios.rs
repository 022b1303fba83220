//! Scenario tests transcribed directly from §8 of the design document.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pritunl_queue::{ExecutorRegistry, Priority, QueueConfig, QueueEngine, QueueExecutor, RunOutcome, TaskError};
use pritunl_store::{memory_store::FileDocumentStore, Messenger};
use serde_json::{json, Value};

struct AlwaysFailsExecutor {
    task_calls: Arc<AtomicUsize>,
    rollback_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl QueueExecutor for AlwaysFailsExecutor {
    async fn task(&self, _payload: &Value) -> Result<(), TaskError> {
        self.task_calls.fetch_add(1, Ordering::SeqCst);
        Err(TaskError::new("simulated failure"))
    }

    async fn rollback_task(&self, _payload: &Value) -> Result<(), TaskError> {
        self.rollback_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn engine_with(registry: ExecutorRegistry, config: QueueConfig) -> (QueueEngine, Arc<FileDocumentStore>) {
    let store = Arc::new(FileDocumentStore::in_memory());
    let messenger = Arc::new(Messenger::new());
    let engine = QueueEngine::new(store.clone(), messenger, registry, config);
    (engine, store)
}

#[tokio::test]
async fn queue_retry_cap_rolls_back_after_max_attempts() {
    let task_calls = Arc::new(AtomicUsize::new(0));
    let rollback_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = ExecutorRegistry::new();
    {
        let task_calls = task_calls.clone();
        let rollback_calls = rollback_calls.clone();
        registry.register(
            "always_fails",
            Arc::new(move || {
                Arc::new(AlwaysFailsExecutor {
                    task_calls: task_calls.clone(),
                    rollback_calls: rollback_calls.clone(),
                }) as Arc<dyn QueueExecutor>
            }),
        );
    }

    let config = QueueConfig {
        default_ttl_seconds: 30,
        max_attempts: 3,
        poll_interval_seconds: 5,
    };
    let (engine, store) = engine_with(registry, config);

    let id = engine
        .enqueue("always_fails", Priority::NORMAL, None, json!({}))
        .await
        .unwrap();

    for _ in 0..4 {
        engine.scan().await.unwrap();
    }

    assert!(store.get("queue", id.as_str()).await.unwrap().is_none(), "document should be removed");
    assert_eq!(task_calls.load(Ordering::SeqCst), 3, "task() runs once per attempt, up to MAX_ATTEMPTS");
    assert_eq!(rollback_calls.load(Ordering::SeqCst), 1, "rollback_task() runs exactly once");
}

struct SlowThenOkExecutor {
    task_calls: Arc<AtomicUsize>,
    sleep: Duration,
}

#[async_trait]
impl QueueExecutor for SlowThenOkExecutor {
    async fn task(&self, _payload: &Value) -> Result<(), TaskError> {
        let call_index = self.task_calls.fetch_add(1, Ordering::SeqCst);
        if call_index == 0 {
            tokio::time::sleep(self.sleep).await;
        }
        Ok(())
    }
}

#[tokio::test]
async fn lease_takeover_after_ttl_expiry_removes_document_exactly_once() {
    let task_calls = Arc::new(AtomicUsize::new(0));

    let mut registry = ExecutorRegistry::new();
    {
        let task_calls = task_calls.clone();
        registry.register(
            "slow",
            Arc::new(move || {
                Arc::new(SlowThenOkExecutor {
                    task_calls: task_calls.clone(),
                    sleep: Duration::from_millis(1500),
                }) as Arc<dyn QueueExecutor>
            }),
        );
    }

    let config = QueueConfig {
        default_ttl_seconds: 1,
        max_attempts: 5,
        poll_interval_seconds: 5,
    };
    let (engine, store) = engine_with(registry, config);
    let engine = Arc::new(engine);

    let id = engine
        .enqueue("slow", Priority::NORMAL, Some(1), json!({}))
        .await
        .unwrap();

    // Runner A claims D and blocks for 1.5s inside task() — past the 1s TTL.
    let doc_a = pritunl_queue::QueueDocument::from_value(
        store.get("queue", id.as_str()).await.unwrap().unwrap(),
    )
    .unwrap();
    let engine_a = engine.clone();
    let runner_a = tokio::spawn(async move { engine_a.run_once(doc_a).await });

    // Give runner A time to win Claim A and enter task() before B starts.
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Runner B reloads D after the lease has expired (elapsed > 1s TTL).
    tokio::time::sleep(Duration::from_millis(900)).await;
    let doc_b = pritunl_queue::QueueDocument::from_value(
        store.get("queue", id.as_str()).await.unwrap().unwrap(),
    )
    .unwrap();
    let outcome_b = engine.run_once(doc_b).await.unwrap();

    let outcome_a = runner_a.await.unwrap().unwrap();

    // Exactly one of the two runners actually drove the document to
    // completion; the other is left with nothing to do once it is gone.
    let completions = [outcome_a, outcome_b].into_iter().filter(|o| *o == RunOutcome::Done).count();
    assert!(completions >= 1, "at least one runner must complete the document");

    assert!(store.get("queue", id.as_str()).await.unwrap().is_none(), "document removed exactly once");
    assert_eq!(task_calls.load(Ordering::SeqCst), 2, "task() ran once per attempt across both runners");
}
