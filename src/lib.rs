//! Average-time benchmarks for inserting into and polling a relational
//! `event` table.
//!
//! A run resets the table's secondary indexes to a configured set, builds a
//! synthetic fixture, and then times either whole-batch inserts or capped
//! polling queries through the [`runner::Runner`]. Results are written as
//! JSON, CSV, semicolon-CSV or LaTeX.

pub mod config;
pub mod dialect;
pub mod error;
pub mod event;
pub mod fixture;
pub mod indexes;
pub mod logging;
pub mod report;
pub mod runner;
pub mod schema;
pub mod stats;
pub mod store;
pub mod suites;
pub mod workload;

pub use error::{BenchError, Result, StoreError};
