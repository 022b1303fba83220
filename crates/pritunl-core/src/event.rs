//! Event-bus seam.
//!
//! The event bus and log-entry persistence layers are out of scope for this
//! crate family (they belong to the admin surface). What the queue engine
//! and node session controller need is somewhere to *publish to*; they are
//! given a trait object rather than a concrete bus so the admin surface can
//! plug in its real implementation while tests use an in-memory recorder.

use crate::ids::OrgId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ServersUpdated,
    UsersUpdated { org_id: OrgId },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// No-op sink, useful as a default for callers that don't care about events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: Event) {}
}
