//! Integration tests for the full pipeline
//!
//! Drives the complete chain (deadline, location filter, deduplication,
//! fan-out to both aggregation sinks) from a scripted source that moves
//! the shared test clock to each event's arrival instant, the way a live
//! receiver would interleave arrivals with the passage of time.

use std::collections::HashMap;

use plume_core::{
    config::EngineConfig,
    events::{Event, LocationId},
    sink::{
        spatial::{MemoryCentroidLog, Position, SpatialAverager},
        windowed::{Average, MemoryAverageLog, WindowedAverager},
        CountingSink, ParallelSink, Sink,
    },
    stream::{Stream, StreamError},
    time::{FixedTime, Timestamp},
    SinkError,
};

/// Source yielding each event at a scripted wall-clock instant
struct ScriptedStream {
    script: Vec<(Timestamp, Event)>,
    position: usize,
    clock: FixedTime,
}

impl ScriptedStream {
    fn new(script: Vec<(Timestamp, Event)>, clock: FixedTime) -> Self {
        Self {
            script,
            position: 0,
            clock,
        }
    }
}

impl Stream for ScriptedStream {
    type Item = Event;
    type Error = StreamError<()>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        match self.script.get(self.position) {
            Some((instant, event)) => {
                self.clock.set(*instant);
                self.position += 1;
                Ok(event.clone())
            }
            None => Err(nb::Error::Other(StreamError::EndOfStream)),
        }
    }
}

fn location_id(id: &str) -> LocationId {
    LocationId::try_from(id).unwrap()
}

fn coordinates() -> HashMap<LocationId, Position> {
    let mut table = HashMap::new();
    table.insert(location_id("alpha"), Position { x: 0.0, y: 0.0 });
    table.insert(location_id("beta"), Position { x: 10.0, y: 0.0 });
    table
}

fn event(location: &str, id: &str, ts: Timestamp, value: f64) -> Event {
    Event::new(location, id, ts, value).unwrap()
}

#[test]
fn full_chain_produces_both_aggregates() {
    let clock = FixedTime::new(100_000);
    let config = EngineConfig::new()
        .run_time_secs(60)
        .dedup_ttl_secs(5)
        .averaging_period_secs(10)
        .expiry_secs(30);

    let pipeline = config
        .build_pipeline([location_id("alpha"), location_id("beta")], clock.clone())
        .unwrap();

    let averages = MemoryAverageLog::new();
    let centroid_log = MemoryCentroidLog::new();
    let windowed = WindowedAverager::new(
        config.averaging_period_secs,
        config.expiry_secs,
        clock.clone(),
        averages.clone(),
    );
    let spatial = SpatialAverager::new(coordinates(), centroid_log.clone());
    let fanout = ParallelSink::new(vec![Box::new(windowed), Box::new(spatial)]);

    let script = vec![
        (100_000, event("alpha", "a1", 100_000, 4.0)),
        (101_000, event("beta", "b1", 101_000, 6.0)),
        // Unknown location: filtered, never reaches dedup or the sinks
        (102_000, event("gamma", "g1", 102_000, 50.0)),
        // Same id within the 5s TTL: duplicate
        (103_000, event("alpha", "a1", 103_000, 9.0)),
        // Same id after the TTL record expired: admitted again
        (106_000, event("alpha", "a1", 112_000, 2.0)),
        (131_000, event("beta", "b2", 131_000, 0.0)),
        (132_000, event("beta", "b3", 131_500, 4.0)),
        (141_000, event("alpha", "a2", 140_500, 8.0)),
        (142_000, event("alpha", "a3", 141_000, 0.5)),
    ];
    let mut source = ScriptedStream::new(script, clock.clone());

    let summary = pipeline.sink(fanout).run(&mut source).unwrap();

    // One pass, counted once regardless of the number of attached sinks
    assert_eq!(summary.events_pulled, 9);
    assert_eq!(summary.stage("deadline").unwrap().passed, 9);
    assert_eq!(summary.stage("location-filter").unwrap().dropped, 1);
    assert_eq!(summary.stage("deduplication").unwrap().dropped, 1);
    assert_eq!(summary.events_delivered, 7);
    assert_eq!(summary.sink_failures, 0);

    // The [100s, 110s) bin collected 4.0 and 6.0 and retired at mean 5.0;
    // the three earlier (empty) bins retired at the 0 convention
    let rows = averages.rows();
    assert_eq!(
        rows,
        vec![
            Average { start: 70_000, end: 80_000, value: 0.0 },
            Average { start: 80_000, end: 90_000, value: 0.0 },
            Average { start: 90_000, end: 100_000, value: 0.0 },
            Average { start: 100_000, end: 110_000, value: 5.0 },
        ]
    );

    // Weighted centroid over the seven delivered events:
    // Σ(x·v) = 10·6 + 10·4 = 100, Σv = 24.5
    let centroid = centroid_log.recorded().unwrap();
    assert!((centroid.x - 100.0 / 24.5).abs() < 1e-9);
    assert!(centroid.y.abs() < 1e-9);
}

#[test]
fn deadline_ends_run_without_draining_source() {
    let clock = FixedTime::new(0);
    let config = EngineConfig::new().run_time_secs(30).dedup_ttl_secs(5);
    let pipeline = config
        .build_pipeline([location_id("alpha")], clock.clone())
        .unwrap();

    let script = vec![
        (1_000, event("alpha", "e1", 1_000, 1.0)),
        (2_000, event("alpha", "e2", 2_000, 1.0)),
        // Past the 30s window: ends the run
        (31_000, event("alpha", "e3", 31_000, 1.0)),
        // Never pulled
        (32_000, event("alpha", "e4", 32_000, 1.0)),
    ];
    let mut source = ScriptedStream::new(script, clock.clone());

    let sink = CountingSink::new();
    let summary = pipeline.sink(sink.clone()).run(&mut source).unwrap();

    assert_eq!(summary.stage("deadline").unwrap().passed, 2);
    assert_eq!(summary.events_pulled, 3); // e3 was pulled, then discarded
    assert_eq!(sink.count(), 2);
    assert!(sink.finished());
}

#[test]
fn empty_spatial_aggregate_fails_the_run() {
    let clock = FixedTime::new(100_000);
    let config = EngineConfig::new().run_time_secs(60);
    let pipeline = config
        .build_pipeline([location_id("alpha")], clock.clone())
        .unwrap();

    let averages = MemoryAverageLog::new();
    let windowed = WindowedAverager::new(10, 30, clock.clone(), averages.clone());
    let spatial = SpatialAverager::new(coordinates(), MemoryCentroidLog::new());
    let fanout = ParallelSink::new(vec![Box::new(windowed), Box::new(spatial)]);

    // Every event is filtered, so the spatial pass has zero total weight
    let script = vec![(101_000, event("nowhere", "e1", 101_000, 3.0))];
    let mut source = ScriptedStream::new(script, clock.clone());

    let result = pipeline.sink(fanout).run(&mut source);
    assert_eq!(result.err(), Some(SinkError::EmptyAggregate));
}

#[test]
fn sink_handle_failure_does_not_end_the_run() {
    /// Sink rejecting every delivery
    struct Rejecting;

    impl Sink for Rejecting {
        fn handle(&mut self, _event: &Event) -> Result<(), SinkError> {
            Err(SinkError::Output("unavailable".into()))
        }

        fn label(&self) -> &'static str {
            "rejecting"
        }
    }

    let clock = FixedTime::new(0);
    let config = EngineConfig::new().run_time_secs(60);
    let pipeline = config
        .build_pipeline([location_id("alpha")], clock.clone())
        .unwrap();

    let healthy = CountingSink::new();
    let fanout = ParallelSink::new(vec![Box::new(Rejecting), Box::new(healthy.clone())]);

    let script = vec![
        (1_000, event("alpha", "e1", 1_000, 1.0)),
        (2_000, event("alpha", "e2", 2_000, 1.0)),
    ];
    let mut source = ScriptedStream::new(script, clock.clone());

    let summary = pipeline.sink(fanout).run(&mut source).unwrap();

    assert_eq!(summary.sink_failures, 2);
    assert_eq!(summary.events_delivered, 2);
    // The healthy member still received every surviving event
    assert_eq!(healthy.count(), 2);
}
