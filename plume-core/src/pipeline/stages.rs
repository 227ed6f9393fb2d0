//! Built-in pipeline stages
//!
//! Three stages cover the filtering the monitor needs before aggregation:
//!
//! - [`DeadlineStage`] bounds the run to a wall-clock window
//! - [`LocationFilterStage`] drops readings from unknown locations
//! - [`DeduplicationStage`] drops repeats of recently seen event ids
//!
//! Each stage owns its clock and its private cache; nothing is shared
//! between stages or with the sinks.

use std::collections::{HashSet, VecDeque};

use log::{debug, info};

use crate::{
    events::{Event, EventId, LocationId},
    time::{TimeSource, Timestamp, MILLIS_PER_SECOND},
};

use super::{Stage, StageStats, Verdict};

/// Stage that ends the run once a wall-clock deadline passes
///
/// The deadline is armed when the first element arrives:
/// `deadline = now + run_time`. Elements arriving before the deadline are
/// passed through and counted; the first element at or past the deadline
/// ends the run, and nothing further is pulled from upstream.
pub struct DeadlineStage<T: TimeSource> {
    run_time_ms: u64,
    deadline: Option<Timestamp>,
    processed: u64,
    clock: T,
}

impl<T: TimeSource> DeadlineStage<T> {
    /// Create a stage that processes events for `run_time_secs` seconds
    pub fn new(run_time_secs: u64, clock: T) -> Self {
        debug_assert!(run_time_secs > 0);
        Self {
            run_time_ms: run_time_secs * MILLIS_PER_SECOND,
            deadline: None,
            processed: 0,
            clock,
        }
    }

    /// Events passed through before the deadline
    pub fn events_processed(&self) -> u64 {
        self.processed
    }
}

impl<T: TimeSource> Stage for DeadlineStage<T> {
    fn apply(&mut self, event: Event) -> Verdict {
        let now = self.clock.now();
        let deadline = *self.deadline.get_or_insert(now + self.run_time_ms);

        if now < deadline {
            self.processed += 1;
            debug!("processing event {}", event.event_id.as_str());
            Verdict::Pass(event)
        } else {
            info!("run window elapsed after {} events", self.processed);
            Verdict::Stop
        }
    }

    fn label(&self) -> &'static str {
        "deadline"
    }

    fn stats(&self) -> StageStats {
        StageStats {
            label: self.label(),
            passed: self.processed,
            dropped: 0,
        }
    }
}

/// Stage that drops events from locations outside a known set
///
/// The set is built once from the external location list and never mutated
/// here. Filtering is idempotent: running the stage over its own output
/// drops nothing.
pub struct LocationFilterStage {
    valid_locations: HashSet<LocationId>,
    passed: u64,
    invalid_filtered: u64,
}

impl LocationFilterStage {
    /// Create a filter over the given set of known location ids
    pub fn new(valid_locations: impl IntoIterator<Item = LocationId>) -> Self {
        Self {
            valid_locations: valid_locations.into_iter().collect(),
            passed: 0,
            invalid_filtered: 0,
        }
    }

    /// Events dropped for an unknown location id
    pub fn invalid_filtered(&self) -> u64 {
        self.invalid_filtered
    }
}

impl Stage for LocationFilterStage {
    fn apply(&mut self, event: Event) -> Verdict {
        if self.valid_locations.contains(&event.location_id) {
            self.passed += 1;
            Verdict::Pass(event)
        } else {
            debug!(
                "ignoring event at unknown location {}",
                event.location_id.as_str()
            );
            self.invalid_filtered += 1;
            Verdict::Drop
        }
    }

    fn label(&self) -> &'static str {
        "location-filter"
    }

    fn stats(&self) -> StageStats {
        StageStats {
            label: self.label(),
            passed: self.passed,
            dropped: self.invalid_filtered,
        }
    }
}

/// Record tracking when an id leaves the deduplication cache
///
/// Created exactly once per admitted event, destroyed when its expiry
/// passes. The live-id set always equals the ids of unexpired records.
#[derive(Debug, Clone, PartialEq)]
struct DedupRecord {
    expiry: Timestamp,
    id: EventId,
}

/// Stage that drops events whose id was seen within a trailing TTL window
///
/// State is a FIFO expiry queue plus a membership set. The TTL is constant,
/// so expiries are monotonically non-decreasing in arrival order and the
/// queue never needs re-sorting; eviction from the front is O(1) amortized.
///
/// Eviction uses a strict comparison (`now > expiry`) and runs *before* the
/// duplicate test, so with `ttl_secs = 0` a burst of same-id events within
/// one clock tick is still deduplicated, while a same-id event arriving
/// after the clock has advanced past the record is admitted again.
pub struct DeduplicationStage<T: TimeSource> {
    ttl_ms: u64,
    expiry_queue: VecDeque<DedupRecord>,
    live_ids: HashSet<EventId>,
    admitted: u64,
    duplicates_ignored: u64,
    clock: T,
}

impl<T: TimeSource> DeduplicationStage<T> {
    /// Create a stage remembering ids for `ttl_secs` seconds
    pub fn new(ttl_secs: u64, clock: T) -> Self {
        Self {
            ttl_ms: ttl_secs * MILLIS_PER_SECOND,
            expiry_queue: VecDeque::new(),
            live_ids: HashSet::new(),
            admitted: 0,
            duplicates_ignored: 0,
            clock,
        }
    }

    /// Events dropped as duplicates
    pub fn duplicates_ignored(&self) -> u64 {
        self.duplicates_ignored
    }

    /// Number of ids currently held in the cache
    pub fn cached_ids(&self) -> usize {
        self.live_ids.len()
    }

    fn evict_expired(&mut self, now: Timestamp) {
        while self
            .expiry_queue
            .front()
            .is_some_and(|record| now > record.expiry)
        {
            if let Some(record) = self.expiry_queue.pop_front() {
                debug!(
                    "expiring deduplication record (cache size: {})",
                    self.live_ids.len()
                );
                self.live_ids.remove(&record.id);
            }
        }
    }
}

impl<T: TimeSource> Stage for DeduplicationStage<T> {
    fn apply(&mut self, event: Event) -> Verdict {
        let now = self.clock.now();
        self.evict_expired(now);

        if self.live_ids.contains(&event.event_id) {
            debug!("found duplicated event: {}", event.event_id.as_str());
            self.duplicates_ignored += 1;
            return Verdict::Drop;
        }

        self.live_ids.insert(event.event_id.clone());
        self.expiry_queue.push_back(DedupRecord {
            expiry: now + self.ttl_ms,
            id: event.event_id.clone(),
        });
        self.admitted += 1;
        Verdict::Pass(event)
    }

    fn label(&self) -> &'static str {
        "deduplication"
    }

    fn stats(&self) -> StageStats {
        StageStats {
            label: self.label(),
            passed: self.admitted,
            dropped: self.duplicates_ignored,
        }
    }
}
