//! Insert and query workloads: the operations the runner times.

use crate::dialect::Dialect;
use crate::error::{BenchError, Result};
use crate::event::{Event, EVENT_TABLE};
use crate::fixture::clear_ids;
use crate::store::EventStore;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

/// Writes whole batches of events through a single store call.
pub struct InsertWorkload<'a> {
    store: &'a dyn EventStore,
}

impl<'a> InsertWorkload<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self { store }
    }

    /// Persist the batch. `true` means the store accepted all of it; a failed
    /// batch leaves its durability unknown.
    pub fn insert_batch(&self, events: &[Event]) -> Result<bool> {
        let written = self
            .store
            .insert_batch(events)
            .map_err(|e| BenchError::workload("insert_batch", e))?;
        Ok(written == events.len())
    }

    /// Persist the batch and keep the ids the store assigned. Events that
    /// already carry an id replace their row.
    pub fn persist(&self, events: &mut [Event]) -> Result<bool> {
        let expected = events.len();
        let written = self
            .store
            .insert_assigning_ids(events)
            .map_err(|e| BenchError::workload("insert_assigning_ids", e))?;
        Ok(written == expected)
    }

    /// Clear ids in parallel, then persist, so the batch always lands as new
    /// rows even when it was persisted before.
    pub fn insert_fresh(&self, events: &mut [Event]) -> Result<bool> {
        clear_ids(events);
        self.persist(events)
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// The three read shapes the query benchmarks poll with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Capped scan, no filter.
    Select,
    /// Capped scan of rows with `emitted = false`.
    SelectWhereEmitted,
    /// As above, ordered by ascending timestamp.
    SelectWhereEmittedOrderByTimestamp,
}

impl QueryShape {
    pub const ALL: [QueryShape; 3] = [
        Self::SelectWhereEmittedOrderByTimestamp,
        Self::SelectWhereEmitted,
        Self::Select,
    ];

    /// Benchmark method name, kept stable so reports stay comparable.
    pub fn benchmark_name(&self) -> &'static str {
        match self {
            Self::Select => "pollEventsSelected",
            Self::SelectWhereEmitted => "pollEventsSelectWhereEmitted",
            Self::SelectWhereEmittedOrderByTimestamp => {
                "pollEventsSelectWhereEmittedOrderByTimestamp"
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::SelectWhereEmitted => "select_where_emitted",
            Self::SelectWhereEmittedOrderByTimestamp => "select_where_emitted_order_by_timestamp",
        }
    }

    /// Dialect-correct SQL for this shape, resolved before any execution.
    pub fn sql(&self, dialect: Dialect, limit: usize, lock_rows: bool) -> String {
        let (filter, order) = match self {
            Self::Select => (false, false),
            Self::SelectWhereEmitted => (true, false),
            Self::SelectWhereEmittedOrderByTimestamp => (true, true),
        };
        dialect.capped_select(EVENT_TABLE, limit, filter, order, lock_rows)
    }
}

impl FromStr for QueryShape {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.label() == s || q.benchmark_name() == s)
            .ok_or_else(|| BenchError::Configuration(format!("unknown query shape `{s}`")))
    }
}

impl fmt::Display for QueryShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Runs a fixed query string repeatedly against a populated table.
pub struct QueryWorkload<'a> {
    store: &'a dyn EventStore,
}

impl<'a> QueryWorkload<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self { store }
    }

    /// Execute `sql` `repetitions` times in sequence. Rows are materialized
    /// and dropped; the total consumed is returned.
    pub fn run_query(&self, sql: &str, repetitions: usize) -> Result<usize> {
        let mut consumed = 0;
        for _ in 0..repetitions {
            consumed += self
                .store
                .query_rows(sql)
                .map_err(|e| BenchError::workload(sql, e))?;
        }
        Ok(consumed)
    }
}
