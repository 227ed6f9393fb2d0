//! Value-weighted spatial average over one pass of the stream
//!
//! [`SpatialAverager`] resolves each event's location to coordinates and
//! accumulates a value-weighted centroid:
//!
//! ```text
//! x̄ = Σ(x·value) / Σvalue      ȳ = Σ(y·value) / Σvalue
//! ```
//!
//! The centroid is computed once the pass completes, in `finish`. A pass
//! with zero total weight fails with [`SinkError::EmptyAggregate`]: the
//! division by zero is surfaced, never coerced to a silent 0/0. Bin
//! averages are defined as 0 when empty instead; the asymmetry is
//! intentional, see [`crate::errors`].

use std::collections::HashMap;

use log::{debug, info};

use crate::{errors::SinkError, events::{Event, LocationId}};

use super::Sink;

/// Coordinates of a known location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Easting of the location
    pub x: f64,
    /// Northing of the location
    pub y: f64,
}

/// Value-weighted centroid of one pass of the stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    /// Weighted mean easting
    pub x: f64,
    /// Weighted mean northing
    pub y: f64,
}

/// Collaborator receiving the finalized [`Centroid`]
pub trait CentroidOutput {
    /// Record the single centroid of a completed pass
    fn record(&mut self, centroid: &Centroid) -> Result<(), SinkError>;
}

/// Sink computing a value-weighted centroid over the whole pass
pub struct SpatialAverager<W: CentroidOutput> {
    coordinates: HashMap<LocationId, Position>,
    weighted_x: f64,
    weighted_y: f64,
    total_value: f64,
    observations: u64,
    output: W,
}

impl<W: CentroidOutput> SpatialAverager<W> {
    /// Create an averager over the given coordinate table
    pub fn new(coordinates: HashMap<LocationId, Position>, output: W) -> Self {
        Self {
            coordinates,
            weighted_x: 0.0,
            weighted_y: 0.0,
            total_value: 0.0,
            observations: 0,
            output,
        }
    }

    /// The centroid of the observations so far
    ///
    /// Fails with [`SinkError::EmptyAggregate`] while the total weight is
    /// zero.
    pub fn centroid(&self) -> Result<Centroid, SinkError> {
        if self.total_value == 0.0 {
            return Err(SinkError::EmptyAggregate);
        }
        Ok(Centroid {
            x: self.weighted_x / self.total_value,
            y: self.weighted_y / self.total_value,
        })
    }

    /// Events whose location resolved to coordinates
    pub fn observations(&self) -> u64 {
        self.observations
    }
}

impl<W: CentroidOutput> Sink for SpatialAverager<W> {
    fn handle(&mut self, event: &Event) -> Result<(), SinkError> {
        match self.coordinates.get(&event.location_id) {
            Some(position) => {
                self.weighted_x += position.x * event.value;
                self.weighted_y += position.y * event.value;
                self.total_value += event.value;
                self.observations += 1;
            }
            None => {
                // Unreachable downstream of the location filter
                debug!(
                    "no coordinates for location {}",
                    event.location_id.as_str()
                );
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let centroid = self.centroid()?;
        info!(
            "weighted average position over {} events is ({}, {})",
            self.observations, centroid.x, centroid.y
        );
        self.output.record(&centroid)
    }

    fn label(&self) -> &'static str {
        "spatial-average"
    }
}

/// In-memory output collector for tests and replays
///
/// Clones share the recorded centroid, so a handle kept outside the
/// pipeline can inspect it after the sink has been moved into a run.
#[derive(Debug, Clone, Default)]
pub struct MemoryCentroidLog {
    recorded: std::rc::Rc<std::cell::RefCell<Option<Centroid>>>,
}

impl MemoryCentroidLog {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// The centroid recorded by `finish`, if any
    pub fn recorded(&self) -> Option<Centroid> {
        *self.recorded.borrow()
    }
}

impl CentroidOutput for MemoryCentroidLog {
    fn record(&mut self, centroid: &Centroid) -> Result<(), SinkError> {
        *self.recorded.borrow_mut() = Some(*centroid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinates() -> HashMap<LocationId, Position> {
        let mut table = HashMap::new();
        table.insert(
            LocationId::try_from("origin").unwrap(),
            Position { x: 0.0, y: 0.0 },
        );
        table.insert(
            LocationId::try_from("east").unwrap(),
            Position { x: 10.0, y: 0.0 },
        );
        table
    }

    fn event(location: &str, value: f64) -> Event {
        Event::new(location, "e", 1_000, value).unwrap()
    }

    #[test]
    fn weighted_centroid() {
        let log = MemoryCentroidLog::new();
        let mut averager = SpatialAverager::new(coordinates(), log.clone());

        averager.handle(&event("origin", 1.0)).unwrap();
        averager.handle(&event("east", 3.0)).unwrap();
        averager.finish().unwrap();

        // x̄ = (0·1 + 10·3) / 4 = 7.5
        assert_eq!(log.recorded(), Some(Centroid { x: 7.5, y: 0.0 }));
    }

    #[test]
    fn zero_total_weight_fails() {
        let log = MemoryCentroidLog::new();
        let mut averager = SpatialAverager::new(coordinates(), log.clone());

        assert_eq!(averager.finish(), Err(SinkError::EmptyAggregate));

        // Zero-valued observations still have no weight
        averager.handle(&event("origin", 0.0)).unwrap();
        assert_eq!(averager.finish(), Err(SinkError::EmptyAggregate));
        assert_eq!(log.recorded(), None);
    }

    #[test]
    fn unknown_location_skipped() {
        let log = MemoryCentroidLog::new();
        let mut averager = SpatialAverager::new(coordinates(), log.clone());

        averager.handle(&event("east", 2.0)).unwrap();
        averager.handle(&event("nowhere", 100.0)).unwrap();
        averager.finish().unwrap();

        assert_eq!(averager.observations(), 1);
        assert_eq!(log.recorded(), Some(Centroid { x: 10.0, y: 0.0 }));
    }
}
