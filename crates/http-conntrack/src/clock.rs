//! Monotonic time for connection activity tracking.

use std::sync::OnceLock;
use std::time::Instant;

/// Newtype for nanosecond-precision timestamps (monotonic clock).
///
/// The zero value is the *idle sentinel*: a connection with
/// `last_message_start == 0` has no message in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestampNs(pub u64);

impl TimestampNs {
    /// No message in flight.
    pub const IDLE: TimestampNs = TimestampNs(0);

    /// Whether this is the idle sentinel.
    pub fn is_idle(self) -> bool {
        self.0 == 0
    }

    /// Returns `self - other`, clamped to zero on underflow.
    pub fn saturating_sub(self, other: TimestampNs) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl std::fmt::Display for TimestampNs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

impl From<u64> for TimestampNs {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<TimestampNs> for u64 {
    fn from(v: TimestampNs) -> Self {
        v.0
    }
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Current monotonic time, measured from a process-local epoch.
///
/// Never returns the idle sentinel: the first reading is clamped to 1ns.
pub fn monotonic_now_ns() -> TimestampNs {
    let epoch = *EPOCH.get_or_init(Instant::now);
    TimestampNs((epoch.elapsed().as_nanos() as u64).max(1))
}
