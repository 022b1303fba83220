//! Layered configuration: CLI flag > environment variable > config file >
//! built-in default. Validation is eager, and suspicious-but-not-invalid
//! combinations get a `tracing::warn!` rather than a hard failure.

use std::path::PathBuf;
use std::time::Duration;

use pritunl_core::constants::{APP_NAME, HTTP_COM_REQUEST_TIMEOUT, HTTP_REQUEST_TIMEOUT, MONGO_QUEUE_MAX_ATTEMPTS, MONGO_QUEUE_TTL_SECONDS};
use serde::Deserialize;

use crate::cli::Args;

#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub app_name: String,
    pub data_root: PathBuf,
    pub queue_ttl_seconds: u64,
    pub queue_max_attempts: u32,
    pub http_request_timeout: Duration,
    pub http_com_request_timeout: Duration,
    pub poll_interval_seconds: u64,
    pub once: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    app_name: Option<String>,
    data_root: Option<PathBuf>,
    queue_ttl_seconds: Option<u64>,
    queue_max_attempts: Option<u32>,
    http_request_timeout_seconds: Option<u64>,
    http_com_request_timeout_seconds: Option<u64>,
    poll_interval_seconds: Option<u64>,
}

impl FileConfig {
    fn load(path: &Option<PathBuf>) -> eyre::Result<Self> {
        let Some(path) = path else { return Ok(Self::default()) };
        let raw = std::fs::read_to_string(path).map_err(|e| eyre::eyre!("failed to read config file {}: {e}", path.display()))?;
        toml::from_str(&raw).map_err(|e| eyre::eyre!("failed to parse config file {}: {e}", path.display()))
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl ControlPlaneConfig {
    pub fn from_cli_and_env(args: &Args) -> eyre::Result<Self> {
        let file = FileConfig::load(&args.config)?;

        let app_name = args
            .app_name
            .clone()
            .or_else(|| std::env::var("APP_NAME").ok())
            .or(file.app_name)
            .unwrap_or_else(|| APP_NAME.to_string());

        let data_root = args.data_root.clone().unwrap_or_else(|| file.data_root.clone().unwrap_or_else(|| PathBuf::from("/var/lib/pritunl")));

        let queue_ttl_seconds = args
            .queue_ttl_seconds
            .or_else(|| env_u64("MONGO_QUEUE_TTL"))
            .or(file.queue_ttl_seconds)
            .unwrap_or(MONGO_QUEUE_TTL_SECONDS);

        let queue_max_attempts = args
            .queue_max_attempts
            .or_else(|| env_u32("MONGO_QUEUE_MAX_ATTEMPTS"))
            .or(file.queue_max_attempts)
            .unwrap_or(MONGO_QUEUE_MAX_ATTEMPTS);

        let http_request_timeout_seconds = args
            .http_request_timeout_seconds
            .or_else(|| env_u64("HTTP_REQUEST_TIMEOUT_SECONDS"))
            .or(file.http_request_timeout_seconds)
            .unwrap_or(HTTP_REQUEST_TIMEOUT.as_secs());

        let http_com_request_timeout_seconds = args
            .http_com_request_timeout_seconds
            .or_else(|| env_u64("HTTP_COM_REQUEST_TIMEOUT_SECONDS"))
            .or(file.http_com_request_timeout_seconds)
            .unwrap_or(HTTP_COM_REQUEST_TIMEOUT.as_secs());

        let poll_interval_seconds = args.poll_interval_seconds.or(file.poll_interval_seconds).unwrap_or(5);

        if queue_ttl_seconds == 0 {
            return Err(eyre::eyre!("queue ttl seconds must be > 0"));
        }
        if poll_interval_seconds == 0 {
            return Err(eyre::eyre!("poll interval seconds must be > 0"));
        }

        if http_com_request_timeout_seconds <= http_request_timeout_seconds {
            tracing::warn!(
                http_request_timeout_seconds,
                http_com_request_timeout_seconds,
                "HTTP_COM_REQUEST_TIMEOUT should be significantly larger than HTTP_REQUEST_TIMEOUT; the long-poll worker may spin"
            );
        }

        Ok(Self {
            app_name,
            data_root,
            queue_ttl_seconds,
            queue_max_attempts,
            http_request_timeout: Duration::from_secs(http_request_timeout_seconds),
            http_com_request_timeout: Duration::from_secs(http_com_request_timeout_seconds),
            poll_interval_seconds,
            once: args.once,
        })
    }
}
