//! The single entity the benchmarks write and read.

use serde::{Deserialize, Serialize};

/// Table every benchmark works against.
pub const EVENT_TABLE: &str = "event";

/// Column capacity of `payload` in the reference schema.
pub const PAYLOAD_CAPACITY: usize = 4096;

/// Payload size used by the benchmarks to simulate a realistic row.
pub const DEFAULT_PAYLOAD_LEN: usize = 4000;

pub const DEFAULT_DESTINATION: &str = "topic_jmh-test";

/// One row of the `event` table.
///
/// `id` is `None` until the store assigns one. Writing an event that still
/// carries an id replaces that row, so callers clear ids before re-inserting
/// a batch they want persisted as new rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Option<i64>,
    pub destination: String,
    pub payload: String,
    pub timestamp: i64,
    pub emitted: bool,
}

impl Event {
    pub fn new(destination: &str, payload: String, timestamp: i64, emitted: bool) -> Self {
        Self {
            id: None,
            destination: destination.to_string(),
            payload,
            timestamp,
            emitted,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
