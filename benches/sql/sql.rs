//! Criterion benchmarks for the event table workloads on in-memory SQLite.
//!
//! Each workload runs once per index configuration. Alongside criterion's own
//! output, a fixed number of single-shot samples per label is written to a
//! JSON report in `target/`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use criterion::{criterion_group, BatchSize, BenchmarkId, Criterion, Throughput};
use sql_event_benchmarks::config::RunOptions;
use sql_event_benchmarks::dialect::Dialect;
use sql_event_benchmarks::event::{Event, EVENT_TABLE};
use sql_event_benchmarks::fixture::{FixtureGenerator, TimestampMode};
use sql_event_benchmarks::indexes::{apply_index_config, IndexConfig, KNOWN_INDEXES};
use sql_event_benchmarks::report::{ResultFormat, ResultRecorder};
use sql_event_benchmarks::stats::Statistics;
use sql_event_benchmarks::store::sqlite::SqliteStore;
use sql_event_benchmarks::store::EventStore;
use sql_event_benchmarks::workload::{InsertWorkload, QueryShape, QueryWorkload};

const INSERT_EVENTS: usize = 2_000;
const QUERY_EVENTS: usize = 10_000;
const QUERY_LIMIT: usize = 500;
const PAYLOAD_LEN: usize = 1_000;
const SAMPLES: usize = 10;

static RECORDER: Mutex<Option<ResultRecorder>> = Mutex::new(None);

fn index_configs() -> Vec<IndexConfig> {
    let mut configs = vec![IndexConfig::none()];
    configs.extend(KNOWN_INDEXES.iter().map(|i| IndexConfig::of(&[*i])));
    configs
}

fn store_with(indexes: &IndexConfig) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    apply_index_config(&store, Dialect::Generic, EVENT_TABLE, indexes).unwrap();
    store
}

fn fixture(count: usize, timestamps: TimestampMode) -> Vec<Event> {
    FixtureGenerator::new(timestamps)
        .with_payload_len(PAYLOAD_LEN)
        .generate(count)
}

fn record(label: &str, indexes: &IndexConfig, mut sample: impl FnMut() -> f64) {
    let stats = Statistics::from_samples((0..SAMPLES).map(|_| sample()).collect());
    eprintln!("{label}: {:.3} ms/op ± {:.3}", stats.mean, stats.error.unwrap_or(f64::NAN));
    if let Some(rec) = RECORDER.lock().unwrap().as_mut() {
        let mut params = HashMap::new();
        params.insert("indexes".into(), serde_json::json!(indexes.label()));
        let options = RunOptions {
            warmup_iterations: 0,
            measurement_iterations: SAMPLES,
            ..RunOptions::default()
        };
        rec.record_statistics(label, params, &options, &stats);
    }
}

fn insert_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert/insertEvents");
    group.throughput(Throughput::Elements(INSERT_EVENTS as u64));
    group.sample_size(10);

    let events = fixture(INSERT_EVENTS, TimestampMode::Jittered);
    for indexes in index_configs() {
        let store = store_with(&indexes);
        let workload = InsertWorkload::new(&store);

        group.bench_function(BenchmarkId::new("indexes", indexes.label()), |b| {
            b.iter_batched(
                || {
                    store.delete_all().unwrap();
                    events.clone()
                },
                |mut batch| workload.insert_fresh(&mut batch).unwrap(),
                BatchSize::LargeInput,
            );
        });

        record(&format!("insert/insertEvents/{}", indexes.label()), &indexes, || {
            store.delete_all().unwrap();
            let start = Instant::now();
            workload.insert_batch(&events).unwrap();
            start.elapsed().as_secs_f64() * 1_000.0
        });
    }
    group.finish();
}

fn poll_events(c: &mut Criterion) {
    let events = fixture(QUERY_EVENTS, TimestampMode::Fixed);

    for shape in QueryShape::ALL {
        let mut group = c.benchmark_group(format!("query/{}", shape.benchmark_name()));
        let sql = shape.sql(Dialect::Generic, QUERY_LIMIT, false);

        for indexes in index_configs() {
            let store = store_with(&indexes);
            store.insert_batch(&events).unwrap();
            let workload = QueryWorkload::new(&store);

            group.bench_function(BenchmarkId::new("indexes", indexes.label()), |b| {
                b.iter(|| workload.run_query(&sql, 1).unwrap());
            });

            let label = format!("query/{}/{}", shape.benchmark_name(), indexes.label());
            record(&label, &indexes, || {
                let start = Instant::now();
                workload.run_query(&sql, 1).unwrap();
                start.elapsed().as_secs_f64() * 1_000.0
            });
        }
        group.finish();
    }
}

criterion_group!(benches, insert_events, poll_events);

fn main() {
    *RECORDER.lock().unwrap() = Some(ResultRecorder::new("sqlite", Dialect::Generic.label()));
    benches();
    if let Some(recorder) = RECORDER.lock().unwrap().take() {
        let _ = recorder.save(Path::new("target"), "criterion-", ResultFormat::Json);
    }
}
