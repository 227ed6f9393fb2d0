//! Core event pipeline for Plume
//!
//! Reduces a continuous stream of sensor readings to two derived outputs: a
//! time-windowed moving average per time bucket, and a value-weighted
//! average position over the whole run.
//!
//! Events are pulled lazily from an external receiver, filtered through a
//! composable stage chain (run-time cutoff, location validity, TTL-based
//! deduplication) and broadcast to independent aggregation sinks.
//!
//! Key properties:
//! - Single-threaded, cooperative, pull-based evaluation; no locks
//! - Strict arrival-order processing, which the stateful stages rely on
//! - Best-effort deduplication only; no persistence across runs
//!
//! ```
//! use plume_core::{
//!     config::EngineConfig,
//!     events::{Event, LocationId},
//!     sink::{windowed::{MemoryAverageLog, WindowedAverager}},
//!     stream::MemoryStream,
//!     time::FixedTime,
//! };
//!
//! let clock = FixedTime::new(30_000);
//! let config = EngineConfig::new().run_time_secs(30);
//!
//! let valid = [LocationId::try_from("site-1").unwrap()];
//! let pipeline = config.build_pipeline(valid, clock.clone()).unwrap();
//!
//! let log = MemoryAverageLog::new();
//! let averager = WindowedAverager::new(
//!     config.averaging_period_secs,
//!     config.expiry_secs,
//!     clock.clone(),
//!     log.clone(),
//! );
//!
//! let events = [Event::new("site-1", "e1", 30_500, 4.2).unwrap()];
//! let mut source = MemoryStream::new(&events);
//! let summary = pipeline.sink(averager).run(&mut source).unwrap();
//! assert_eq!(summary.events_delivered, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod sink;
pub mod stream;
pub mod time;

// Public API
pub use config::{ConfigError, EngineConfig};
pub use errors::SinkError;
pub use events::{Event, EventId, LocationId};
pub use pipeline::{
    stages::{DeadlineStage, DeduplicationStage, LocationFilterStage},
    Pipeline, PipelineWithSink, RunSummary, Stage, StageStats, Verdict,
};
pub use sink::{
    spatial::{Centroid, CentroidOutput, Position, SpatialAverager},
    windowed::{Average, AverageOutput, WindowedAverager},
    ParallelSink, Sink,
};
pub use stream::{MemoryStream, Stream, StreamError};
pub use time::{FixedTime, SystemClock, TimeSource, Timestamp};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
