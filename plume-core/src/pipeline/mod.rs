//! Composable event-processing pipeline
//!
//! ## Overview
//!
//! A pipeline is an ordered chain of [`Stage`]s through which events flow one
//! at a time, followed by a terminal [`Sink`](crate::sink::Sink):
//!
//! ```text
//! Receiver → Deadline → LocationFilter → Deduplication → Sink(s)
//!    ↓          ↓             ↓                ↓            ↓
//!  Pull      Cut off       Drop unknown    Drop repeats  Aggregate
//! ```
//!
//! Stages are order-preserving filters: each one inspects an event and
//! decides to pass it on, drop it, or end the run. Every stage keeps its own
//! pass/drop counters which stay readable after the stream ends, so the
//! embedding process can report totals without the pipeline knowing about
//! reporting.
//!
//! ## Composition
//!
//! Pipelines compose associatively: a [`Pipeline`] is a stage list, and
//! [`Pipeline::combine`] concatenates two lists, so
//! `(a.combine(b)).combine(c)` and `a.combine(b.combine(c))` produce the
//! same chain. [`Pipeline::sink`] attaches the terminal consumer, producing
//! the runnable [`PipelineWithSink`].
//!
//! ## Evaluation model
//!
//! Single-threaded, cooperative, pull-based: the pump requests one element
//! from the source, walks it through the stage list, hands survivors to the
//! sink, and only then pulls the next element. Nothing is materialized and
//! nothing runs concurrently; stages own their private state outright.
//!
//! ## Fan-out
//!
//! The filtering chain is consumed exactly **once**, no matter how many
//! consumers are attached. Multiple consumers attach as a
//! [`ParallelSink`](crate::sink::ParallelSink), and the pump broadcasts each
//! surviving event to every member sink synchronously, in arrival order,
//! before the next element is pulled. This is the depth-one form of a tee
//! into per-sink buffers: each sink sees every surviving event exactly once,
//! stage counters count each event exactly once, and a failing sink cannot
//! starve or corrupt its peers. Attaching sinks by re-running the upstream
//! chain once per sink would multiply every stage counter by the number of
//! sinks and re-trigger the receiver; this implementation does not do that.
//!
//! ## Sink failures
//!
//! An error from [`Sink::handle`](crate::sink::Sink::handle) is reported
//! (warn-logged and counted in the [`RunSummary`]) but does not end the run:
//! aggregation state stays consistent and the sink keeps receiving events.
//! Errors from [`Sink::finish`](crate::sink::Sink::finish) propagate to the
//! caller, since they represent an unusable final aggregate.

pub mod stages;

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    errors::SinkError,
    events::Event,
    sink::Sink,
    stream::Stream,
};

/// How long the pump yields when the source has nothing buffered
const IDLE_POLL_BACKOFF: Duration = Duration::from_millis(5);

/// A stage's decision about one event
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Hand the event to the next stage (or the sink)
    Pass(Event),
    /// Discard the event and pull the next one
    Drop,
    /// End the run; remaining upstream elements are not pulled
    Stop,
}

/// Pass/drop counters for one stage, readable after the stream ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    /// Stage label, for reporting
    pub label: &'static str,
    /// Events this stage passed downstream
    pub passed: u64,
    /// Events this stage dropped
    pub dropped: u64,
}

/// An order-preserving transform over the event sequence
///
/// Stages run on the pump's thread; there is no concurrency inside the
/// pipeline, so implementations are free to hold non-`Send` state.
pub trait Stage {
    /// Inspect one event and decide what happens to it
    fn apply(&mut self, event: Event) -> Verdict;

    /// Stage label for reporting and logs
    fn label(&self) -> &'static str;

    /// Current counters
    fn stats(&self) -> StageStats;
}

/// An ordered chain of stages
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create a pipeline from a single stage
    pub fn new(stage: impl Stage + 'static) -> Self {
        Self {
            stages: vec![Box::new(stage)],
        }
    }

    /// Append one stage to the chain
    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Concatenate two pipelines
    ///
    /// The result applies `self`'s stages first, then `other`'s.
    /// Concatenation is associative and preserves element order.
    pub fn combine(mut self, mut other: Pipeline) -> Pipeline {
        self.stages.append(&mut other.stages);
        self
    }

    /// Run one event through the whole chain
    pub fn apply(&mut self, mut event: Event) -> Verdict {
        for stage in &mut self.stages {
            match stage.apply(event) {
                Verdict::Pass(passed) => event = passed,
                Verdict::Drop => return Verdict::Drop,
                Verdict::Stop => return Verdict::Stop,
            }
        }
        Verdict::Pass(event)
    }

    /// Counters of every stage, in chain order
    pub fn stats(&self) -> Vec<StageStats> {
        self.stages.iter().map(|stage| stage.stats()).collect()
    }

    /// Attach the terminal consumer, producing a runnable pipeline
    pub fn sink<K: Sink>(self, sink: K) -> PipelineWithSink<K> {
        PipelineWithSink {
            pipeline: self,
            sink,
        }
    }
}

/// A pipeline with its terminal sink attached
pub struct PipelineWithSink<K: Sink> {
    pipeline: Pipeline,
    sink: K,
}

impl<K: Sink> PipelineWithSink<K> {
    /// Pump the source through the chain into the sink until the stream
    /// ends or a stage stops the run
    ///
    /// Returns the run summary; the only error source is
    /// [`Sink::finish`], whose failures must reach the caller.
    pub fn run<S>(&mut self, source: &mut S) -> Result<RunSummary, SinkError>
    where
        S: Stream<Item = Event>,
        S::Error: core::fmt::Debug,
    {
        let started = Instant::now();
        let mut events_pulled: u64 = 0;
        let mut events_delivered: u64 = 0;
        let mut sink_failures: u64 = 0;

        loop {
            match source.poll_next() {
                Ok(event) => {
                    events_pulled += 1;
                    match self.pipeline.apply(event) {
                        Verdict::Pass(event) => {
                            events_delivered += 1;
                            if let Err(e) = self.sink.handle(&event) {
                                sink_failures += 1;
                                warn!("sink '{}' rejected an event: {}", self.sink.label(), e);
                            }
                        }
                        Verdict::Drop => {}
                        Verdict::Stop => break,
                    }
                }
                Err(nb::Error::WouldBlock) => {
                    // Cooperative yield while the receiver has nothing buffered
                    std::thread::sleep(IDLE_POLL_BACKOFF);
                }
                Err(nb::Error::Other(e)) => {
                    debug!("event source ended: {:?}", e);
                    break;
                }
            }
        }

        self.sink.finish()?;

        let summary = RunSummary {
            events_pulled,
            events_delivered,
            sink_failures,
            elapsed_ms: started.elapsed().as_millis() as u64,
            stages: self.pipeline.stats(),
        };
        info!(
            "run complete: {} pulled, {} delivered, {} sink failures in {}ms",
            summary.events_pulled,
            summary.events_delivered,
            summary.sink_failures,
            summary.elapsed_ms,
        );
        Ok(summary)
    }

    /// Counters of the underlying stage chain
    pub fn stats(&self) -> Vec<StageStats> {
        self.pipeline.stats()
    }
}

/// Observational summary of one pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Events pulled from the source (including any discarded at cutoff)
    pub events_pulled: u64,
    /// Events that survived every stage and reached the sink
    pub events_delivered: u64,
    /// Sink deliveries that were rejected (reported, nonfatal)
    pub sink_failures: u64,
    /// Wall-clock duration of the run
    pub elapsed_ms: u64,
    /// Per-stage counters, in chain order
    pub stages: Vec<StageStats>,
}

impl RunSummary {
    /// Throughput over the observed run duration
    pub fn events_per_second(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0.0;
        }
        self.events_pulled as f64 * 1_000.0 / self.elapsed_ms as f64
    }

    /// Counters of the stage with the given label, if present
    pub fn stage(&self, label: &str) -> Option<&StageStats> {
        self.stages.iter().find(|stats| stats.label == label)
    }
}
