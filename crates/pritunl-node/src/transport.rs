//! HTTPS transport to one remote node daemon. Mirrors the request/response
//! handling shape of a bundler-style RPC client: build the URL, send JSON,
//! check status, surface the body.

use std::time::Duration;

use pritunl_core::ServerId;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::NodeError;
use crate::protocol::{Call, CallResponse};

/// What `/com` returned on its most recent long-poll.
pub enum ComOutcome {
    /// The remote has pending calls for us to dispatch.
    Calls(Vec<Call>),
    /// 410 Gone: the remote session has ended; exit cleanly.
    Gone,
}

#[derive(Debug, Clone)]
pub struct NodeTransport {
    http: reqwest::Client,
}

impl NodeTransport {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    fn base_url(scheme: &str, ip: &str, port: u16, server_id: &ServerId) -> String {
        format!("{scheme}://{ip}:{port}/server/{server_id}")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        &self,
        server_id: &ServerId,
        scheme: &str,
        ip: &str,
        port: u16,
        node_key: &str,
        network: &str,
        local_networks: &[String],
        ovpn_conf: &str,
        server_ver: &str,
        timeout: Duration,
    ) -> Result<(), NodeError> {
        let url = Self::base_url(scheme, ip, port, server_id);
        let body = serde_json::json!({
            "network": network,
            "local_networks": local_networks,
            "ovpn_conf": ovpn_conf,
            "server_ver": server_ver,
        });

        let resp = self
            .http
            .post(&url)
            .header("API-Key", node_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|source| NodeError::NodeConnection { server_id: server_id.clone(), reason: source.to_string() })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(NodeError::InvalidNodeApiKey { server_id: server_id.clone(), status_code: status.as_u16() });
        }
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(NodeError::ServerStart { server_id: server_id.clone(), status_code: status.as_u16(), reason });
        }

        Ok(())
    }

    pub async fn stop(&self, server_id: &ServerId, scheme: &str, ip: &str, port: u16, node_key: &str, timeout: Duration) -> Result<(), NodeError> {
        let url = Self::base_url(scheme, ip, port, server_id);
        let resp = self
            .http
            .delete(&url)
            .header("API-Key", node_key)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| NodeError::NodeConnection { server_id: server_id.clone(), reason: source.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(NodeError::ServerStop { server_id: server_id.clone(), status_code: status.as_u16(), reason });
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn poll_com(
        &self,
        server_id: &ServerId,
        scheme: &str,
        ip: &str,
        port: u16,
        node_key: &str,
        responses: &[CallResponse],
        timeout: Duration,
    ) -> Result<ComOutcome, NodeError> {
        let url = format!("{}/com", Self::base_url(scheme, ip, port, server_id));

        let resp = self
            .http
            .put(&url)
            .header("API-Key", node_key)
            .timeout(timeout)
            .json(responses)
            .send()
            .await
            .map_err(|source| NodeError::NodeConnection { server_id: server_id.clone(), reason: source.to_string() })?;

        let status = resp.status();
        if status == StatusCode::GONE {
            return Ok(ComOutcome::Gone);
        }
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(NodeError::NodeConnection { server_id: server_id.clone(), reason: format!("status {status}: {reason}") });
        }

        let calls: Vec<Call> = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        Ok(ComOutcome::Calls(calls))
    }
}

impl Default for NodeTransport {
    fn default() -> Self {
        Self::new()
    }
}
