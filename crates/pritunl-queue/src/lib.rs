//! At-most-one-runner, lease-based, three-phase task queue.

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;

pub use config::QueueConfig;
pub use document::{Priority, QueueDocument, QueueState};
pub use engine::{QueueEngine, RunOutcome};
pub use error::QueueError;
pub use executor::{ExecutorFactory, ExecutorRegistry, QueueExecutor, TaskError};
