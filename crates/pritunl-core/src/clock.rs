//! Injectable time source.
//!
//! Lease expiry (queue) and the `start_time - 1s` monotonicity stamp (node
//! session) both do wall-clock arithmetic that needs to be deterministic in
//! tests. A trait object takes the place of scattered `Utc::now()` calls
//! so tests can substitute a fixed clock instead of racing real time.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
