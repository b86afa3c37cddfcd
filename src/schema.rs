//! JSON report layout.
//!
//! Reports from different backends, dialects and index configurations share
//! this shape so `bench-compare` can line them up by benchmark name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Bumped on incompatible layout changes.
    pub schema_version: u32,
    pub metadata: RunMetadata,
    pub results: Vec<BenchmarkResult>,
}

/// Where and when a run happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// RFC 3339, taken when the recorder is created.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Uncommitted changes in the working tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
    pub harness_version: String,
    /// `sqlite` or `duckdb`.
    pub backend: String,
    /// Dialect label the SQL was rendered for.
    pub dialect: String,
    pub hardware: HardwareInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    /// Logical cores.
    pub cores: usize,
    pub os: String,
    pub arch: String,
}

/// Score of one registration, e.g. `query/pollEventsSelectWhereEmitted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub benchmark: String,
    /// Always `avgt`.
    pub mode: String,
    pub threads: usize,
    pub warmup_iterations: usize,
    pub measurement_iterations: usize,
    /// Index configuration, row counts, query shape.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, serde_json::Value>,
    pub metrics: BenchmarkMetrics,
}

/// Average time per operation. Every value is in `score_unit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub score: f64,
    /// Half-width of the 99.9% confidence interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_error: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_confidence: Option<(f64, f64)>,
    pub score_unit: String,
    pub min: f64,
    pub max: f64,
    pub samples: u64,
    /// Per-worker, per-iteration samples in measurement order.
    #[serde(default)]
    pub raw_data: Vec<f64>,
}
