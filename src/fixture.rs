//! Synthetic event generation.
//!
//! Count and shape are reproducible; payload content and timestamp jitter are
//! random on every call. Nothing here touches the store, so fixtures can be
//! built during setup without leaking into the measured time.

use crate::event::{Event, DEFAULT_DESTINATION, DEFAULT_PAYLOAD_LEN};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rayon::prelude::*;

/// How event timestamps are spread around the base time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampMode {
    /// `base + random(0, count)`.
    Jittered,
    /// `base + 1` for every event.
    Fixed,
}

#[derive(Debug, Clone)]
pub struct FixtureGenerator {
    pub destination: String,
    pub payload_len: usize,
    pub timestamps: TimestampMode,
    pub base_time: i64,
}

impl FixtureGenerator {
    pub fn new(timestamps: TimestampMode) -> Self {
        Self {
            destination: DEFAULT_DESTINATION.to_string(),
            payload_len: DEFAULT_PAYLOAD_LEN,
            timestamps,
            base_time: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_destination(mut self, destination: &str) -> Self {
        self.destination = destination.to_string();
        self
    }

    pub fn with_payload_len(mut self, payload_len: usize) -> Self {
        self.payload_len = payload_len;
        self
    }

    pub fn with_base_time(mut self, base_time: i64) -> Self {
        self.base_time = base_time;
        self
    }

    /// Generate `count` unsaved events. Even indexes are emitted, odd are not.
    pub fn generate(&self, count: usize) -> Vec<Event> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|i| {
                let timestamp = match self.timestamps {
                    TimestampMode::Jittered => {
                        self.base_time + rng.gen_range(0..count.max(1)) as i64
                    }
                    TimestampMode::Fixed => self.base_time + 1,
                };
                let payload: String = (&mut rng)
                    .sample_iter(&Alphanumeric)
                    .take(self.payload_len)
                    .map(char::from)
                    .collect();
                Event::new(&self.destination, payload, timestamp, i % 2 == 0)
            })
            .collect()
    }
}

/// Reset every id so the next insert writes the batch as new rows.
pub fn clear_ids(events: &mut [Event]) {
    events.par_iter_mut().for_each(|event| event.id = None);
}
