//! Time-bucketed moving average over the event stream
//!
//! ## Overview
//!
//! [`WindowedAverager`] partitions events into fixed-width, contiguous,
//! half-open time bins `[start, end)` and finalizes a bin into an
//! [`Average`] once the bin's end lags the wall clock by more than the
//! configured retention period. The stream is only approximately ordered,
//! so a bin stays open for the whole retention period to collect
//! stragglers; events older than the retained window are dropped.
//!
//! ## Bin management
//!
//! The bin deque is seeded with a zero-width bin ending `retention` before
//! construction time, so the first event always triggers ordinary bin
//! creation. Bins are appended on demand to keep the sequence contiguous
//! (`bins[i].end == bins[i+1].start`, no gaps), the seed is removed once a
//! real bin exists so every retained bin has uniform width, and at most one
//! bin is retired per event processed. Retiring the only bin re-seeds the
//! deque at the retired bin's end, so there is always at least one bin and
//! the stale-event cutoff never moves backwards.
//!
//! ## Empty bins
//!
//! A bin retired without observations produces an [`Average`] of 0 rather
//! than being skipped. Consumers must treat 0 as a possible "no data"
//! placeholder; see the note on [`Average::value`].

use std::collections::VecDeque;

use log::{debug, info};

use crate::{
    errors::SinkError,
    events::Event,
    time::{TimeSource, Timestamp, MILLIS_PER_SECOND},
};

use super::Sink;

/// Finalized average of one retired bin
#[derive(Debug, Clone, PartialEq)]
pub struct Average {
    /// Inclusive start of the bin, milliseconds since the epoch
    pub start: Timestamp,
    /// Exclusive end of the bin
    pub end: Timestamp,
    /// Arithmetic mean of the bin's values
    ///
    /// 0.0 when the bin was retired without any observations; callers
    /// cannot distinguish "no data" from a measured zero.
    pub value: f64,
}

/// One open time bucket
#[derive(Debug, Clone)]
struct Bin {
    start: Timestamp,
    end: Timestamp,
    values: Vec<f64>,
}

impl Bin {
    fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            values: Vec::new(),
        }
    }

    /// The zero-width bin used to seed the deque
    fn is_seed(&self) -> bool {
        self.start == self.end
    }

    fn finalize(self) -> Average {
        let value = if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        };
        Average {
            start: self.start,
            end: self.end,
            value,
        }
    }
}

/// Collaborator receiving each finalized [`Average`]
pub trait AverageOutput {
    /// Record one finalized average
    fn record(&mut self, average: &Average) -> Result<(), SinkError>;
}

/// Sink computing a moving average over fixed-width time bins
pub struct WindowedAverager<T: TimeSource, W: AverageOutput> {
    period_ms: u64,
    retention_ms: u64,
    bins: VecDeque<Bin>,
    clock: T,
    output: W,
}

impl<T: TimeSource, W: AverageOutput> WindowedAverager<T, W> {
    /// Create an averager with `averaging_period_secs`-wide bins retained
    /// for `retention_secs` past their end
    ///
    /// Both periods must be positive, and retention should be at least the
    /// averaging period so a bin can collect a full period of data before
    /// retirement ([`crate::config::EngineConfig::validate`] enforces this
    /// for configuration-driven construction).
    pub fn new(averaging_period_secs: u64, retention_secs: u64, clock: T, output: W) -> Self {
        debug_assert!(averaging_period_secs > 0);
        debug_assert!(retention_secs > 0);

        let retention_ms = retention_secs * MILLIS_PER_SECOND;
        let seed = clock.now().saturating_sub(retention_ms);
        let mut bins = VecDeque::new();
        bins.push_back(Bin::new(seed, seed));

        Self {
            period_ms: averaging_period_secs * MILLIS_PER_SECOND,
            retention_ms,
            bins,
            clock,
            output,
        }
    }

    /// Bounds of the currently retained bins, oldest first
    pub fn bin_spans(&self) -> Vec<(Timestamp, Timestamp)> {
        self.bins.iter().map(|bin| (bin.start, bin.end)).collect()
    }

    /// The attached output collaborator
    pub fn output(&self) -> &W {
        &self.output
    }

    fn add_to_bin(&mut self, event: &Event) {
        let Some(front_start) = self.bins.front().map(|bin| bin.start) else {
            return; // cannot happen: the deque is re-seeded whenever it drains
        };

        // Older than the retained window: drop
        if event.timestamp < front_start {
            debug!("not averaging stale event at timestamp {}", event.timestamp);
            return;
        }

        // Append contiguous bins until the event's instant is covered
        while let Some(back) = self.bins.back() {
            if event.timestamp < back.end {
                break;
            }
            let end = back.end;
            debug!(
                "adding bin [{}, {}) for event at timestamp {}",
                end,
                end + self.period_ms,
                event.timestamp
            );
            self.bins.push_back(Bin::new(end, end + self.period_ms));

            // The zero-width seed has served its purpose once a real bin
            // exists; removing it keeps bin widths uniform for indexing
            if self.bins.len() > 1 && self.bins.front().is_some_and(Bin::is_seed) {
                self.bins.pop_front();
            }
        }

        let Some(front_start) = self.bins.front().map(|bin| bin.start) else {
            return;
        };
        let index = ((event.timestamp - front_start) / self.period_ms) as usize;
        if let Some(bin) = self.bins.get_mut(index) {
            bin.values.push(event.value);
        }
    }

    /// Retire at most one bin whose end has aged past the retention period
    fn maybe_expire_first_bin(&mut self) -> Option<Average> {
        let cutoff = self.clock.now().saturating_sub(self.retention_ms);
        let front_end = self.bins.front().map(|bin| bin.end)?;
        if cutoff <= front_end {
            return None;
        }

        let bin = self.bins.pop_front()?;
        if self.bins.is_empty() {
            // Keep the deque seeded so the stale-event cutoff stays monotone
            self.bins.push_back(Bin::new(bin.end, bin.end));
        }
        Some(bin.finalize())
    }
}

impl<T: TimeSource, W: AverageOutput> Sink for WindowedAverager<T, W> {
    fn handle(&mut self, event: &Event) -> Result<(), SinkError> {
        self.add_to_bin(event);

        if let Some(average) = self.maybe_expire_first_bin() {
            info!(
                "average value for {} to {} is {}",
                average.start, average.end, average.value
            );
            // The bin is already retired; a rejected row loses only that row
            self.output.record(&average)?;
        }
        Ok(())
    }

    fn label(&self) -> &'static str {
        "windowed-average"
    }
}

/// In-memory output collector for tests and replays
///
/// Clones share the collected rows, so a handle kept outside the pipeline
/// can inspect them after the sink has been moved into a run.
#[derive(Debug, Clone, Default)]
pub struct MemoryAverageLog {
    rows: std::rc::Rc<std::cell::RefCell<Vec<Average>>>,
}

impl MemoryAverageLog {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the rows recorded so far
    pub fn rows(&self) -> Vec<Average> {
        self.rows.borrow().clone()
    }

    /// Number of rows recorded so far
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }
}

impl AverageOutput for MemoryAverageLog {
    fn record(&mut self, average: &Average) -> Result<(), SinkError> {
        self.rows.borrow_mut().push(average.clone());
        Ok(())
    }
}
