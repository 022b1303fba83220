//! Shared primitives used by every control-plane subsystem: typed identifiers,
//! an injectable clock, the fixed constants of the node protocol and archive
//! layout, and the event/log seams that the queue engine and node session
//! controller publish through.

pub mod clock;
pub mod constants;
pub mod event;
pub mod ids;
pub mod log;

pub use clock::{Clock, SystemClock};
pub use event::{Event, EventSink, NullEventSink};
pub use ids::{OrgId, QueueId, ServerId, UserId};
pub use log::{LogSink, TracingLogSink};
