//! Wire shapes exchanged over the `/com` long-poll channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One remote-issued command awaiting a response.
#[derive(Debug, Clone, Deserialize)]
pub struct Call {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// The reply piggybacked on the next `/com` poll. `response` is whatever
/// the handler returned, JSON-serialized; callers that return nothing send
/// `Value::Null` rather than omitting the pair.
#[derive(Debug, Clone, Serialize)]
pub struct CallResponse {
    pub id: String,
    pub response: Value,
}
