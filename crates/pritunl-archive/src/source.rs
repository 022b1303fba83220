//! The dynamic part of the archive layout: which organizations, users, and
//! servers exist and where their on-disk files live. Enumerating these is
//! the organization database's job, not this crate's — callers implement
//! [`ArchiveSource`] over whatever store backs their deployment.

use std::path::PathBuf;

use async_trait::async_trait;
use pritunl_core::{OrgId, ServerId, UserId};

#[derive(Debug, Clone)]
pub struct UserArchiveEntry {
    pub user_id: UserId,
    pub request_path: PathBuf,
    pub key_path: PathBuf,
    pub cert_path: PathBuf,
    pub doc_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OrgArchiveEntry {
    pub org_id: OrgId,
    pub doc_path: PathBuf,
    pub ca_request_path: PathBuf,
    pub ca_key_path: PathBuf,
    pub ca_cert_path: PathBuf,
    pub ca_doc_path: PathBuf,
    pub users: Vec<UserArchiveEntry>,
}

#[derive(Debug, Clone)]
pub struct ServerArchiveEntry {
    pub server_id: ServerId,
    pub dh_param_path: PathBuf,
    pub ip_pool_path: PathBuf,
    pub doc_path: PathBuf,
}

#[async_trait]
pub trait ArchiveSource: Send + Sync {
    async fn organizations(&self) -> Vec<OrgArchiveEntry>;
    async fn servers(&self) -> Vec<ServerArchiveEntry>;
}
