use pritunl_core::ServerId;
use thiserror::Error;

/// Typed error taxonomy at the node session controller's public boundary.
/// Each variant carries its structured context (`server_id`, `status_code`,
/// `reason`) as fields rather than folding them into a message string.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("server {server_id} cannot start without any attached organizations")]
    MissingOrganization { server_id: ServerId },

    #[error("failed to connect to node server {server_id}: {reason}")]
    NodeConnection { server_id: ServerId, reason: String },

    #[error("invalid node server api key for {server_id} (status {status_code})")]
    InvalidNodeApiKey { server_id: ServerId, status_code: u16 },

    #[error("failed to start node server {server_id}: status {status_code}, {reason}")]
    ServerStart {
        server_id: ServerId,
        status_code: u16,
        reason: String,
    },

    #[error("failed to stop node server {server_id}: status {status_code}, {reason}")]
    ServerStop {
        server_id: ServerId,
        status_code: u16,
        reason: String,
    },
}
