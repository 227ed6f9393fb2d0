//! Terminal consumers of the pipeline's output
//!
//! A [`Sink`] receives every event that survives the filtering chain and
//! maintains its own aggregation state over it. Sinks are independent:
//! [`ParallelSink`] broadcasts each surviving event to every member, in
//! arrival order, so a failing or slow member can neither starve nor
//! corrupt the others (see the fan-out notes in [`crate::pipeline`]).
//!
//! Delivery errors from [`Sink::handle`] are reported by the pump but do not
//! end the run; errors from [`Sink::finish`] propagate, since they represent
//! an unusable final aggregate.

pub mod spatial;
pub mod windowed;

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;

use crate::{errors::SinkError, events::Event};

/// A terminal consumer of pipeline output
pub trait Sink {
    /// Consume one surviving event
    fn handle(&mut self, event: &Event) -> Result<(), SinkError>;

    /// Finalize after the stream ends
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Sink label for reporting and logs
    fn label(&self) -> &'static str;
}

/// Fan-out sink broadcasting each event to every member
///
/// Every member receives every event even when an earlier member fails;
/// the first delivery error is returned after the broadcast completes.
/// `finish` likewise finishes every member before surfacing the first
/// error, so one sink's failed aggregate cannot suppress another's.
pub struct ParallelSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl ParallelSink {
    /// Create a fan-out over the given member sinks
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }
}

impl Sink for ParallelSink {
    fn handle(&mut self, event: &Event) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.handle(event) {
                warn!("sink '{}' failed to handle event: {}", sink.label(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                warn!("sink '{}' failed to finalize: {}", sink.label(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn label(&self) -> &'static str {
        "parallel"
    }
}

/// Counting sink for tests and smoke runs
///
/// Clones share their counters, so a handle kept outside the pipeline can
/// observe deliveries after the sink itself has been moved into the run.
#[derive(Debug, Clone, Default)]
pub struct CountingSink {
    state: Rc<RefCell<CountingState>>,
}

#[derive(Debug, Default)]
struct CountingState {
    handled: u64,
    finished: bool,
}

impl CountingSink {
    /// Create a sink counting from zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Events handled so far
    pub fn count(&self) -> u64 {
        self.state.borrow().handled
    }

    /// Whether `finish` has been called
    pub fn finished(&self) -> bool {
        self.state.borrow().finished
    }
}

impl Sink for CountingSink {
    fn handle(&mut self, _event: &Event) -> Result<(), SinkError> {
        self.state.borrow_mut().handled += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.state.borrow_mut().finished = true;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "counting"
    }
}
