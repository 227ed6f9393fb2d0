//! Stream abstraction for event sources
//!
//! ## Overview
//!
//! Events arrive from an external receiver (a message queue subscription in
//! production, an in-memory slice in tests and replays) as an effectively
//! infinite, lazily pulled sequence. This module provides the common
//! interface: each element is produced only when requested, so an unbounded
//! input never needs to be materialized.
//!
//! ## Design Rationale
//!
//! The trait uses the `nb` crate pattern for non-blocking pulls:
//! - `WouldBlock`: nothing buffered yet, try again later
//! - `Ok(item)`: next item ready
//! - `Err(e)`: permanent error (including end of stream)
//!
//! This works equally well for a polling event loop over a live queue
//! subscription and for finite replay sources.

use crate::events::Event;

/// Stream error types
#[derive(Debug)]
pub enum StreamError<E> {
    /// Underlying transport error
    Transport(E),
    /// Data format error
    Format(&'static str),
    /// Stream exhausted
    EndOfStream,
}

/// Core stream trait for event sources
///
/// Pulling is the only way elements are produced; implementations must
/// yield elements in arrival order, since the stateful pipeline stages
/// (deduplication expiry, bin contiguity) depend on it.
pub trait Stream {
    /// Item type produced by the stream
    type Item;

    /// Error type for stream operations
    type Error;

    /// Poll for the next item (non-blocking)
    ///
    /// Returns:
    /// - `Ok(item)`: next item available
    /// - `Err(nb::Error::WouldBlock)`: try again later
    /// - `Err(nb::Error::Other(e))`: permanent error
    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error>;

    /// Hint about remaining items
    ///
    /// Used for progress tracking; `(0, None)` when unknown.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

/// Memory-based stream for testing and replay
///
/// ## Use Cases
///
/// 1. **Unit testing**: feed known event sequences
/// 2. **Replay**: re-process captured data
///
/// ## Example
///
/// ```
/// use plume_core::events::Event;
/// use plume_core::stream::{MemoryStream, Stream};
///
/// let events = [
///     Event::new("l1", "e1", 1_000, 4.0).unwrap(),
///     Event::new("l1", "e2", 2_000, 6.0).unwrap(),
/// ];
///
/// let mut stream = MemoryStream::new(&events);
/// assert!(stream.poll_next().is_ok());
/// ```
pub struct MemoryStream<'a> {
    /// Slice of events to stream
    events: &'a [Event],
    /// Current position
    position: usize,
}

impl<'a> MemoryStream<'a> {
    /// Create new memory stream from a slice
    pub fn new(events: &'a [Event]) -> Self {
        Self {
            events,
            position: 0,
        }
    }

    /// Reset to the beginning
    pub fn reset(&mut self) {
        self.position = 0;
    }
}

impl<'a> Stream for MemoryStream<'a> {
    type Item = Event;
    type Error = StreamError<()>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        if self.position >= self.events.len() {
            return Err(nb::Error::Other(StreamError::EndOfStream));
        }

        let event = self.events[self.position].clone();
        self.position += 1;
        Ok(event)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.events.len() - self.position;
        (remaining, Some(remaining))
    }
}
