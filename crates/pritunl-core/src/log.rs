//! Log-entry seam.
//!
//! Mirrors [`crate::event`]: the user-visible "Stopped server", "Lost
//! connection", and auth-failure log entries are persisted by a
//! collaborator this crate family doesn't own. `LogSink` is the interface
//! that collaborator is reached through.

pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards to `tracing`, for binaries/tests that don't have a real
/// log-entry store wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, message: &str) {
        tracing::info!(target: "pritunl::log_entry", "{message}");
    }
}
