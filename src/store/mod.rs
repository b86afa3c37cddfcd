//! Store access interface and its backends.
//!
//! The harness never talks to a database directly; it goes through
//! [`EventStore`], which covers exactly what the workloads and the index
//! controller need. Backends:
//! - [`sqlite::SqliteStore`]: in-memory or file-backed SQLite, always built
//! - `duck::DuckDbStore`: DuckDB, behind the `duckdb` cargo feature

pub mod sqlite;

#[cfg(feature = "duckdb")]
pub mod duck;

use crate::error::{BenchError, Result, StoreError};
use crate::event::Event;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Narrow data-access interface over the `event` table.
///
/// Implementations are shared by every worker thread of a run, so they must
/// be `Send + Sync` and handle their own connection locking.
pub trait EventStore: Send + Sync {
    /// Backend name for logs and reports.
    fn backend(&self) -> &str;

    /// Persist the batch in a single call. Events without an id become new
    /// rows; events with an id replace the row with that id.
    fn insert_batch(&self, events: &[Event]) -> StoreResult<usize>;

    /// Persist the batch like [`insert_batch`](Self::insert_batch), then
    /// record the store-assigned id on every event that was inserted as a new
    /// row. Inserting the same slice again replaces those rows.
    fn insert_assigning_ids(&self, events: &mut [Event]) -> StoreResult<usize>;

    /// Run a statement that returns no rows (DDL).
    fn execute(&self, sql: &str) -> StoreResult<()>;

    /// Run a query, materialize every row and drop it. Returns the row count.
    fn query_rows(&self, sql: &str) -> StoreResult<usize>;

    /// Run a `SELECT *` over the event table and return the rows as events.
    fn fetch_events(&self, sql: &str) -> StoreResult<Vec<Event>>;

    fn count(&self) -> StoreResult<u64>;

    fn delete_all(&self) -> StoreResult<()>;

    /// Names of the secondary indexes currently defined on `table`.
    fn index_names(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Whether the backend accepts row-locking read clauses.
    fn supports_row_locking(&self) -> bool {
        false
    }

    /// Hand cached memory back between benchmark iterations.
    fn release_memory(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Open the backend named by a connection descriptor.
///
/// - `sqlite::memory:` or `sqlite:<path>`
/// - `duckdb::memory:` or `duckdb:<path>` (requires the `duckdb` feature)
///
/// Descriptors for engines without a bundled driver are a configuration error.
pub fn open_store(url: &str) -> Result<Box<dyn EventStore>> {
    if let Some(target) = url.strip_prefix("sqlite:") {
        let store = if is_memory(target) {
            sqlite::SqliteStore::open_in_memory()
        } else {
            sqlite::SqliteStore::open(target)
        };
        return store
            .map(|s| Box::new(s) as Box<dyn EventStore>)
            .map_err(|e| BenchError::workload("open store", e));
    }

    if let Some(target) = url.strip_prefix("duckdb:") {
        return open_duckdb(target);
    }

    Err(BenchError::Configuration(format!(
        "no bundled driver for datasource `{url}` (expected sqlite:... or duckdb:...)"
    )))
}

fn is_memory(target: &str) -> bool {
    matches!(target, ":memory:" | "memory" | "")
}

#[cfg(feature = "duckdb")]
fn open_duckdb(target: &str) -> Result<Box<dyn EventStore>> {
    let store = if is_memory(target) {
        duck::DuckDbStore::open_in_memory()
    } else {
        duck::DuckDbStore::open(target)
    };
    store
        .map(|s| Box::new(s) as Box<dyn EventStore>)
        .map_err(|e| BenchError::workload("open store", e))
}

#[cfg(not(feature = "duckdb"))]
fn open_duckdb(_target: &str) -> Result<Box<dyn EventStore>> {
    Err(BenchError::Configuration(
        "duckdb datasource requested but the `duckdb` feature is not enabled".to_string(),
    ))
}
