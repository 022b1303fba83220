//! Seams for the collaborators the node session controller depends on but
//! does not own: organization/user identity checks and OpenVPN server
//! configuration rendering. Both are explicitly out of scope for this crate
//! (certificate authority primitives, the ovpn template engine, and the
//! organization database); callers supply implementations.

use async_trait::async_trait;
use pritunl_core::{OrgId, ServerId, UserId};

use crate::error::NodeError;

/// Organization and user identity checks backing `tls_verify`/`otp_verify`.
#[async_trait]
pub trait OrgUserRepo: Send + Sync {
    async fn org_exists(&self, org_id: &OrgId) -> bool;
    async fn user_exists(&self, org_id: &OrgId, user_id: &UserId) -> bool;
    async fn verify_otp(&self, org_id: &OrgId, user_id: &UserId, otp_code: &str) -> bool;
}

/// Produces the payload `start()` needs to hand the node: the rendered
/// OpenVPN server config and the networks it serves.
#[async_trait]
pub trait OvpnConfigProvider: Send + Sync {
    async fn org_count(&self, server_id: &ServerId) -> usize;
    async fn render_ovpn_conf(&self, server_id: &ServerId) -> Result<String, NodeError>;
    async fn network(&self, server_id: &ServerId) -> String;
    async fn local_networks(&self, server_id: &ServerId) -> Vec<String>;
}
