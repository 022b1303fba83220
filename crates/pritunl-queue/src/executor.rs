//! Executor capability set and registry.
//!
//! Picking an executor by `queue_type` is naturally a subclass-and-register
//! dance in a dynamically typed language. Rust has no subclassing to hang
//! that on, so the registry instead maps a `queue_type` string to a factory
//! that produces a trait object implementing the same three-phase
//! capability set.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TaskError(pub String);

impl TaskError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The three-phase capability set every queue executor implements. All
/// phases default to a no-op so an executor that only cares about `task`
/// doesn't have to write empty bodies for the other two.
#[async_trait]
pub trait QueueExecutor: Send + Sync {
    async fn task(&self, _payload: &Value) -> Result<(), TaskError> {
        Ok(())
    }

    async fn post_task(&self, _payload: &Value) -> Result<(), TaskError> {
        Ok(())
    }

    async fn rollback_task(&self, _payload: &Value) -> Result<(), TaskError> {
        Ok(())
    }
}

pub trait ExecutorFactory: Send + Sync {
    fn create(&self) -> Arc<dyn QueueExecutor>;
}

impl<F> ExecutorFactory for F
where
    F: Fn() -> Arc<dyn QueueExecutor> + Send + Sync,
{
    fn create(&self) -> Arc<dyn QueueExecutor> {
        (self)()
    }
}

#[derive(Default)]
pub struct ExecutorRegistry {
    factories: HashMap<String, Arc<dyn ExecutorFactory>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, queue_type: impl Into<String>, factory: Arc<dyn ExecutorFactory>) {
        self.factories.insert(queue_type.into(), factory);
    }

    pub fn resolve(&self, queue_type: &str) -> Option<Arc<dyn QueueExecutor>> {
        self.factories.get(queue_type).map(|f| f.create())
    }
}
