//! The queue document and its wire/storage representation.

use chrono::{DateTime, Utc};
use pritunl_core::QueueId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    Pending,
    Committed,
    Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub const NORMAL: Priority = Priority(0);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

/// A persistent record of a unit of work, shaped after a `Queue` Mongo
/// document: `id` stands in for `_id`; `payload` is a single JSON value
/// rather than a set of subclass-specific document fields, since a
/// registry-dispatched executor has no subclass to hang per-type fields on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDocument {
    pub id: QueueId,
    pub state: QueueState,
    pub priority: Priority,
    pub attempts: u32,
    pub queue_type: String,
    pub ttl_seconds: u64,
    pub ttl_timestamp: Option<DateTime<Utc>>,
    pub runner_id: Option<String>,
    pub payload: Value,
}

impl QueueDocument {
    pub fn new(queue_type: impl Into<String>, priority: Priority, ttl_seconds: u64, payload: Value) -> Self {
        Self {
            id: QueueId::new(uuid::Uuid::new_v4().to_string()),
            state: QueueState::Pending,
            priority,
            attempts: 0,
            queue_type: queue_type.into(),
            ttl_seconds,
            ttl_timestamp: None,
            runner_id: None,
            payload,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("QueueDocument always serializes")
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// serde(default) on Priority isn't derivable directly since it wraps i32;
// implement (de)serialize by hand so Priority round-trips as a bare integer.
impl Serialize for Priority {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Priority(i32::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_through_json() {
        let doc = QueueDocument::new("ovpn_restart", Priority::NORMAL, 30, json!({"server_id": "s1"}));
        let value = doc.to_value();
        let back = QueueDocument::from_value(value).unwrap();
        assert_eq!(back.queue_type, "ovpn_restart");
        assert_eq!(back.state, QueueState::Pending);
        assert_eq!(back.attempts, 0);
    }
}
