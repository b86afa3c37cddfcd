//! Error types for the benchmark harness.
//!
//! Every variant of [`BenchError`] aborts the run it occurs in. Nothing is
//! retried: a benchmark that continued past a failed setup would report
//! numbers for a configuration that was never actually in place.

use thiserror::Error;

/// Failure raised by an [`EventStore`](crate::store::EventStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "duckdb")]
    #[error("duckdb: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("unsupported: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum BenchError {
    /// Missing or invalid run parameters. Raised before any workload runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An index drop/create statement failed.
    #[error("schema mutation failed for `{statement}`: {source}")]
    SchemaMutation {
        statement: String,
        #[source]
        source: StoreError,
    },

    /// A store call failed while setting up or running a workload.
    #[error("workload `{operation}` failed: {source}")]
    WorkloadExecution {
        operation: String,
        #[source]
        source: StoreError,
    },

    /// The fixture does not have the shape the benchmark expects.
    #[error("fixture mismatch: expected {expected} events, found {actual}")]
    FixtureMismatch { expected: u64, actual: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BenchError {
    pub(crate) fn workload(operation: impl Into<String>, source: StoreError) -> Self {
        Self::WorkloadExecution {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn schema(statement: impl Into<String>, source: StoreError) -> Self {
        Self::SchemaMutation {
            statement: statement.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
