//! Layered queue configuration: explicit override, then environment
//! variable, then built-in default — the same precedence the reference
//! implementation's `KeeperConfig::from_cli_and_deployment` applies to its
//! own tunables.

use pritunl_core::constants::{MONGO_QUEUE_MAX_ATTEMPTS, MONGO_QUEUE_TTL_SECONDS};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub default_ttl_seconds: u64,
    pub max_attempts: u32,
    pub poll_interval_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_ttl_seconds: MONGO_QUEUE_TTL_SECONDS,
            max_attempts: MONGO_QUEUE_MAX_ATTEMPTS,
            poll_interval_seconds: 5,
        }
    }
}

impl QueueConfig {
    /// Applies `MONGO_QUEUE_TTL` / `MONGO_QUEUE_MAX_ATTEMPTS` over the
    /// defaults if present and parseable; a present-but-unparseable value is
    /// logged and ignored rather than treated as fatal.
    pub fn from_env(mut self) -> Self {
        if let Some(ttl) = env_u64("MONGO_QUEUE_TTL") {
            self.default_ttl_seconds = ttl;
        }
        if let Some(max_attempts) = env_u64("MONGO_QUEUE_MAX_ATTEMPTS") {
            self.max_attempts = max_attempts as u32;
        }
        self
    }
}

fn env_u64(key: &str) -> Option<u64> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(key, raw, "ignoring unparseable env override");
                None
            }
        },
        Err(_) => None,
    }
}
