//! External collaborators for the Plume pipeline
//!
//! ## Overview
//!
//! The core engine (`plume-core`) treats everything that touches the
//! outside world as an injected collaborator. This crate provides those
//! collaborators:
//!
//! - **Event receiver** ([`receiver`]): decodes wire payloads into
//!   [`plume_core::Event`]s and, behind the `mqtt` feature, exposes a live
//!   message-queue subscription as a lazily pulled
//!   [`plume_core::stream::Stream`].
//! - **Location provider** ([`locations`]): fetches the list of known
//!   locations used to build the filter's id set and the spatial
//!   averager's coordinate table. HTTP implementation behind the `http`
//!   feature; an in-memory provider for tests and offline replays.
//! - **Aggregate outputs** ([`report`]): tabular (CSV) writers receiving
//!   each finalized average and the end-of-run centroid.
//!
//! The pipeline never opens or closes connections itself; it only pulls
//! from whatever receiver it is handed until its run window ends.

pub mod config;
pub mod locations;
pub mod receiver;
pub mod report;

pub use config::{LocationsConfig, ReceiverConfig};
pub use locations::{
    coordinate_table, id_set, parse_locations, LocationProvider, LocationRecord, StaticLocations,
};
pub use receiver::decode_event;
pub use report::{CsvAverageLog, CsvCentroidLog};

#[cfg(feature = "http")]
pub use locations::HttpLocationProvider;

#[cfg(feature = "mqtt")]
pub use receiver::MqttReceiver;

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// A payload or document could not be decoded
    #[error("malformed data: {0}")]
    Malformed(String),

    /// The connector was misconfigured
    #[error("configuration error: {0}")]
    Config(String),
}
