//! Error types for pipeline sinks
//!
//! The two failure modes sinks can surface are deliberately asymmetric:
//!
//! - A retired bin with no observations is *not* an error: its average is
//!   defined as 0 (see [`crate::sink::windowed`]).
//! - A spatial aggregate over zero total weight *is* an error
//!   ([`SinkError::EmptyAggregate`]): the weighted centroid would divide by
//!   zero, and silently coercing that to a position would fabricate data.
//!
//! Output failures ([`SinkError::Output`]) are reported to the caller but
//! never corrupt a sink's aggregation state; the sink remains usable for
//! subsequent events.

use thiserror::Error;

/// Errors surfaced by pipeline sinks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The aggregate has zero total weight, so no centroid can be computed
    #[error("aggregate has zero total weight")]
    EmptyAggregate,

    /// The external output collaborator rejected a finalized aggregate
    #[error("aggregate output failed: {0}")]
    Output(String),
}
