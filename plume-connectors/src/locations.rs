//! Location provider - the list of known measurement sites
//!
//! The provider is consumed once at startup. Its records feed two things:
//! the location filter's id set ([`id_set`]) and the spatial averager's
//! coordinate table ([`coordinate_table`]). The locations document is a
//! JSON array:
//!
//! ```json
//! [{"x": 1.1, "y": 1.2, "id": "abc"}, {"x": 2.1, "y": 2.2, "id": "def"}]
//! ```

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::Deserialize;

use plume_core::{events::LocationId, sink::spatial::Position};

use crate::ConnectorError;

/// One entry of the locations document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationRecord {
    /// Location identifier as it appears on events
    pub id: String,
    /// Easting of the site
    pub x: f64,
    /// Northing of the site
    pub y: f64,
}

/// Source of the known-location list
pub trait LocationProvider {
    /// Fetch the full location list
    fn fetch(&mut self) -> Result<Vec<LocationRecord>, ConnectorError>;
}

/// Parse a locations document
pub fn parse_locations(bytes: &[u8]) -> Result<Vec<LocationRecord>, ConnectorError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ConnectorError::Malformed(format!("malformed locations document: {e}")))
}

/// Build the filter's id set from fetched records
///
/// Records whose id does not fit the bounded id type are skipped with a
/// warning; events carrying such an id could never match anyway.
pub fn id_set(records: &[LocationRecord]) -> HashSet<LocationId> {
    records
        .iter()
        .filter_map(|record| bounded_id(&record.id))
        .collect()
}

/// Build the spatial averager's coordinate table from fetched records
pub fn coordinate_table(records: &[LocationRecord]) -> HashMap<LocationId, Position> {
    records
        .iter()
        .filter_map(|record| {
            bounded_id(&record.id).map(|id| {
                (
                    id,
                    Position {
                        x: record.x,
                        y: record.y,
                    },
                )
            })
        })
        .collect()
}

fn bounded_id(id: &str) -> Option<LocationId> {
    match LocationId::try_from(id) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("skipping location with oversized id ({} bytes)", id.len());
            None
        }
    }
}

/// In-memory provider for tests and offline replays
#[derive(Debug, Clone, Default)]
pub struct StaticLocations {
    records: Vec<LocationRecord>,
}

impl StaticLocations {
    /// Provider returning the given records
    pub fn new(records: Vec<LocationRecord>) -> Self {
        Self { records }
    }
}

impl LocationProvider for StaticLocations {
    fn fetch(&mut self) -> Result<Vec<LocationRecord>, ConnectorError> {
        Ok(self.records.clone())
    }
}

#[cfg(feature = "http")]
pub use http::HttpLocationProvider;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use super::{parse_locations, LocationProvider, LocationRecord};
    use crate::{config::LocationsConfig, ConnectorError};

    /// Provider fetching the locations document over HTTP
    pub struct HttpLocationProvider {
        agent: ureq::Agent,
        url: String,
    }

    impl HttpLocationProvider {
        /// Create a provider for the configured document URL
        pub fn new(config: &LocationsConfig) -> Self {
            let agent = ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build();
            Self {
                agent,
                url: config.url.clone(),
            }
        }
    }

    impl LocationProvider for HttpLocationProvider {
        fn fetch(&mut self) -> Result<Vec<LocationRecord>, ConnectorError> {
            let response = self
                .agent
                .get(&self.url)
                .call()
                .map_err(|e| ConnectorError::Transport(e.to_string()))?;
            let body = response
                .into_string()
                .map_err(|e| ConnectorError::Transport(e.to_string()))?;
            parse_locations(body.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_LOCATIONS: &str =
        r#"[{"x": 1.1, "y": 1.2, "id": "abc"}, {"x": 2.1, "y": 2.2, "id": "def"}]"#;

    #[test]
    fn parses_empty_document() {
        assert_eq!(parse_locations(b"[]").unwrap(), vec![]);
    }

    #[test]
    fn parses_valid_document() {
        let records = parse_locations(VALID_LOCATIONS.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            LocationRecord {
                id: "abc".into(),
                x: 1.1,
                y: 1.2
            }
        );
    }

    #[test]
    fn rejects_malformed_document() {
        let result = parse_locations(br#"[{"foo": "bar"}]"#);
        match result {
            Err(ConnectorError::Malformed(reason)) => {
                assert!(reason.contains("malformed locations document"))
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn builds_filter_set_and_coordinate_table() {
        let records = parse_locations(VALID_LOCATIONS.as_bytes()).unwrap();

        let ids = id_set(&records);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&LocationId::try_from("abc").unwrap()));

        let table = coordinate_table(&records);
        assert_eq!(
            table[&LocationId::try_from("def").unwrap()],
            Position { x: 2.1, y: 2.2 }
        );
    }

    #[test]
    fn oversized_ids_skipped() {
        let records = vec![
            LocationRecord {
                id: "ok".into(),
                x: 0.0,
                y: 0.0,
            },
            LocationRecord {
                id: "x".repeat(plume_core::events::MAX_ID_LEN + 1),
                x: 1.0,
                y: 1.0,
            },
        ];

        assert_eq!(id_set(&records).len(), 1);
        assert_eq!(coordinate_table(&records).len(), 1);
    }

    #[test]
    fn static_provider_round_trips() {
        let records = parse_locations(VALID_LOCATIONS.as_bytes()).unwrap();
        let mut provider = StaticLocations::new(records.clone());
        assert_eq!(provider.fetch().unwrap(), records);
    }
}
