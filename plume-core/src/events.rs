//! Event type flowing through the processing pipeline
//!
//! An [`Event`] is a single sensor reading: where it was measured, a unique
//! id for deduplication, when it was measured, and the measured value.
//! Events are immutable once produced; stages observe and may drop them,
//! never mutate them.
//!
//! Identifiers are capacity-bounded inline strings ([`heapless::String`]) so
//! that events stay cheap to clone and never touch the heap on the hot path.
//! The capacity comfortably fits a UUID (36 characters) with headroom.

use crate::time::Timestamp;

/// Maximum length in bytes of a location or event identifier
pub const MAX_ID_LEN: usize = 48;

/// Identifier of the location a reading was taken at
pub type LocationId = heapless::String<MAX_ID_LEN>;

/// Unique identifier of a single reading, used for deduplication
pub type EventId = heapless::String<MAX_ID_LEN>;

/// A single sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Where the reading was taken
    pub location_id: LocationId,
    /// Unique id of this reading
    pub event_id: EventId,
    /// When the reading was taken, in milliseconds since the epoch
    pub timestamp: Timestamp,
    /// The measured value
    pub value: f64,
}

impl Event {
    /// Create an event from borrowed identifiers
    ///
    /// Returns `None` if either identifier exceeds [`MAX_ID_LEN`] bytes.
    pub fn new(location_id: &str, event_id: &str, timestamp: Timestamp, value: f64) -> Option<Self> {
        Some(Self {
            location_id: LocationId::try_from(location_id).ok()?,
            event_id: EventId::try_from(event_id).ok()?,
            timestamp,
            value,
        })
    }

    /// Create an event from already-bounded identifiers
    pub fn from_parts(
        location_id: LocationId,
        event_id: EventId,
        timestamp: Timestamp,
        value: f64,
    ) -> Self {
        Self {
            location_id,
            event_id,
            timestamp,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_construction() {
        let event = Event::new("loc-1", "5f64a2e0-1c11-4a7d-9f6e-000000000001", 1_000, 4.5)
            .unwrap();

        assert_eq!(event.location_id.as_str(), "loc-1");
        assert_eq!(event.timestamp, 1_000);
        assert_eq!(event.value, 4.5);
    }

    #[test]
    fn oversized_id_rejected() {
        let long_id = "x".repeat(MAX_ID_LEN + 1);
        assert!(Event::new(&long_id, "e1", 0, 0.0).is_none());
        assert!(Event::new("l1", &long_id, 0, 0.0).is_none());

        // Exactly at the limit is fine
        let max_id = "y".repeat(MAX_ID_LEN);
        assert!(Event::new(&max_id, "e1", 0, 0.0).is_some());
    }
}
