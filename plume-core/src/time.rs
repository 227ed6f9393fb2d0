//! Time management for the event pipeline
//!
//! Every time-dependent decision in the pipeline (run cutoff, deduplication
//! expiry, bin retirement) goes through the [`TimeSource`] trait so that
//! tests can drive a pipeline deterministically with [`FixedTime`] while
//! production uses the wall clock.
//!
//! Event timestamps and the local clock are assumed comparable; correctness
//! under producer/consumer clock skew is explicitly out of scope.

use core::cell::Cell;
use std::rc::Rc;

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Milliseconds per second, for converting second-granularity configuration
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// Source of time for the pipeline
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

/// Wall clock time source backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new wall clock source
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed time source for testing
///
/// Clones share the underlying instant, so one handle can drive every stage
/// and sink of an assembled pipeline:
///
/// ```
/// use plume_core::time::{FixedTime, TimeSource};
///
/// let clock = FixedTime::new(1_000);
/// let stage_clock = clock.clone();
///
/// clock.advance(500);
/// assert_eq!(stage_clock.now(), 1_500);
/// ```
#[derive(Debug, Clone)]
pub struct FixedTime {
    instant: Rc<Cell<Timestamp>>,
}

impl FixedTime {
    /// Create a fixed clock reading `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            instant: Rc::new(Cell::new(timestamp)),
        }
    }

    /// Move the clock to an absolute instant
    pub fn set(&self, timestamp: Timestamp) {
        self.instant.set(timestamp);
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.instant.set(self.instant.get() + ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.instant.get()
    }
}
