//! Shared test utilities for building stores and fixtures.

#![allow(dead_code)]

use sql_event_benchmarks::config::{RunOptions, SuiteSettings};
use sql_event_benchmarks::dialect::Dialect;
use sql_event_benchmarks::event::Event;
use sql_event_benchmarks::fixture::{FixtureGenerator, TimestampMode};
use sql_event_benchmarks::runner::HarnessContext;
use sql_event_benchmarks::store::sqlite::SqliteStore;
use sql_event_benchmarks::store::EventStore;
use std::path::Path;

// =============================================================================
// Stores
// =============================================================================

pub fn memory_store() -> SqliteStore {
    SqliteStore::open_in_memory().expect("failed to open in-memory sqlite")
}

pub fn file_store(dir: &Path) -> SqliteStore {
    SqliteStore::open(dir.join("events.db")).expect("failed to open sqlite file")
}

// =============================================================================
// Fixtures
// =============================================================================

/// Short payloads keep integration tests fast; shape is unaffected.
pub const TEST_PAYLOAD_LEN: usize = 32;

pub fn events(count: usize, timestamps: TimestampMode) -> Vec<Event> {
    FixtureGenerator::new(timestamps)
        .with_payload_len(TEST_PAYLOAD_LEN)
        .generate(count)
}

pub fn populated_store(count: usize, timestamps: TimestampMode) -> SqliteStore {
    let store = memory_store();
    store
        .insert_batch(&events(count, timestamps))
        .expect("failed to insert fixture");
    store
}

// =============================================================================
// Runner
// =============================================================================

pub fn small_settings() -> SuiteSettings {
    SuiteSettings {
        insert_events: 50,
        query_events: 80,
        query_repetitions: 3,
        query_limit: 20,
        payload_len: TEST_PAYLOAD_LEN,
        ..SuiteSettings::default()
    }
}

pub fn quick_options(result_dir: &Path) -> RunOptions {
    RunOptions {
        warmup_iterations: 1,
        measurement_iterations: 2,
        threads: 1,
        result_dir: result_dir.to_path_buf(),
        ..RunOptions::default()
    }
}

pub fn context(settings: SuiteSettings) -> HarnessContext {
    HarnessContext::new(Box::new(memory_store()), Dialect::Generic, settings)
}
