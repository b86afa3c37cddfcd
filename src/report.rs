//! Result recorder: accumulates benchmark results and writes the report file.
//!
//! The file lands at `<dir>/<prefix><timestamp>.<ext>`. JSON follows the types
//! in [`crate::schema`]; CSV, semicolon-CSV and LaTeX carry the summary
//! columns only.

use crate::config::RunOptions;
use crate::error::{BenchError, Result};
use crate::schema::*;
use crate::stats::Statistics;
use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MODE_AVERAGE_TIME: &str = "avgt";
pub const UNIT_MS: &str = "ms/op";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Json,
    Csv,
    /// Semicolon-separated values.
    Scsv,
    Latex,
}

impl ResultFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Scsv => "scsv",
            Self::Latex => "tex",
        }
    }
}

impl FromStr for ResultFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "scsv" => Ok(Self::Scsv),
            "latex" | "tex" => Ok(Self::Latex),
            other => Err(BenchError::Configuration(format!(
                "unknown result format `{other}` (json, csv, scsv, latex)"
            ))),
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `<prefix><mm-dd-yyyy-HH-MM-SS>.<ext>`
pub fn result_file_name(prefix: &str, at: DateTime<Local>, format: ResultFormat) -> String {
    format!(
        "{}{}.{}",
        prefix,
        at.format("%m-%d-%Y-%H-%M-%S"),
        format.extension()
    )
}

/// Accumulates benchmark results and writes them to a report file.
pub struct ResultRecorder {
    metadata: RunMetadata,
    results: Vec<BenchmarkResult>,
}

impl ResultRecorder {
    /// Run metadata is taken now, not when the report is saved.
    pub fn new(backend: &str, dialect: &str) -> Self {
        Self {
            metadata: RunMetadata {
                timestamp: Utc::now().to_rfc3339(),
                git_commit: git(&["rev-parse", "--short", "HEAD"]),
                git_branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
                git_dirty: git(&["status", "--porcelain"]).map(|s| !s.is_empty()),
                harness_version: env!("CARGO_PKG_VERSION").to_string(),
                backend: backend.to_string(),
                dialect: dialect.to_string(),
                hardware: capture_hardware(),
            },
            results: Vec::new(),
        }
    }

    /// Record an average-time result from measured statistics.
    pub fn record_statistics(
        &mut self,
        name: &str,
        parameters: HashMap<String, serde_json::Value>,
        options: &RunOptions,
        stats: &Statistics,
    ) {
        self.results.push(BenchmarkResult {
            benchmark: name.to_string(),
            mode: MODE_AVERAGE_TIME.to_string(),
            threads: options.threads,
            warmup_iterations: options.warmup_iterations,
            measurement_iterations: options.measurement_iterations,
            parameters,
            metrics: BenchmarkMetrics {
                score: stats.mean,
                score_error: stats.error,
                score_confidence: stats.confidence_interval(),
                score_unit: UNIT_MS.to_string(),
                min: stats.min,
                max: stats.max,
                samples: stats.count() as u64,
                raw_data: stats.samples.clone(),
            },
        });
    }

    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn into_report(self) -> BenchmarkReport {
        BenchmarkReport {
            schema_version: 1,
            metadata: self.metadata,
            results: self.results,
        }
    }

    /// Write all accumulated results to `<dir>/<prefix><timestamp>.<ext>`.
    pub fn save(self, dir: &Path, prefix: &str, format: ResultFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(result_file_name(prefix, Local::now(), format));
        let report = self.into_report();
        let body = render(&report, format)?;
        std::fs::write(&path, body)?;
        log::info!("Results saved to {}", path.display());
        Ok(path)
    }
}

/// Serialize a report in the requested format.
pub fn render(report: &BenchmarkReport, format: ResultFormat) -> Result<String> {
    Ok(match format {
        ResultFormat::Json => serde_json::to_string_pretty(report)?,
        ResultFormat::Csv => render_separated(report, b',')?,
        ResultFormat::Scsv => render_separated(report, b';')?,
        ResultFormat::Latex => render_latex(report),
    })
}

fn param_keys(report: &BenchmarkReport) -> Vec<String> {
    let mut keys: Vec<String> = report
        .results
        .iter()
        .flat_map(|r| r.parameters.keys().cloned())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn param_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn render_separated(report: &BenchmarkReport, delimiter: u8) -> Result<String> {
    let keys = param_keys(report);
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(Vec::new());

    let mut header: Vec<String> = [
        "Benchmark",
        "Mode",
        "Threads",
        "Samples",
        "Score",
        "Score Error (99.9%)",
        "Unit",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    header.extend(keys.iter().map(|k| format!("Param: {k}")));
    wtr.write_record(&header).map_err(std::io::Error::from)?;

    for r in &report.results {
        let mut row = vec![
            r.benchmark.clone(),
            r.mode.clone(),
            r.threads.to_string(),
            r.metrics.samples.to_string(),
            format!("{:.6}", r.metrics.score),
            r.metrics
                .score_error
                .map(|e| format!("{e:.6}"))
                .unwrap_or_else(|| "NaN".to_string()),
            r.metrics.score_unit.clone(),
        ];
        row.extend(keys.iter().map(|k| param_text(r.parameters.get(k))));
        wtr.write_record(&row).map_err(std::io::Error::from)?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

fn latex_escape(s: &str) -> String {
    s.replace('\\', "\\textbackslash{}")
        .replace('_', "\\_")
        .replace('&', "\\&")
        .replace('%', "\\%")
        .replace('#', "\\#")
}

fn render_latex(report: &BenchmarkReport) -> String {
    let mut out = String::new();
    out.push_str("\\begin{tabular}{l l r r r r l}\n\\hline\n");
    out.push_str("Benchmark & Mode & Threads & Cnt & Score & Error & Units \\\\\n\\hline\n");
    for r in &report.results {
        let error = r
            .metrics
            .score_error
            .map(|e| format!("{e:.3}"))
            .unwrap_or_else(|| "NaN".to_string());
        out.push_str(&format!(
            "{} & {} & {} & {} & {:.3} & {} & {} \\\\\n",
            latex_escape(&r.benchmark),
            r.mode,
            r.threads,
            r.metrics.samples,
            r.metrics.score,
            error,
            latex_escape(&r.metrics.score_unit),
        ));
    }
    out.push_str("\\hline\n\\end{tabular}\n");
    out
}

/// Print a summary table of recorded results.
pub fn print_summary(results: &[BenchmarkResult]) {
    let width = results
        .iter()
        .map(|r| r.benchmark.len())
        .max()
        .unwrap_or(9)
        .max(9);

    println!();
    println!(
        "{:<width$}  {:>4}  {:>3}  {:>12}     {:>12}  {:<6}",
        "Benchmark", "Mode", "Cnt", "Score", "Error", "Units"
    );
    for r in results {
        let error = r
            .metrics
            .score_error
            .map(|e| format!("{e:>12.3}"))
            .unwrap_or_else(|| format!("{:>12}", "NaN"));
        println!(
            "{:<width$}  {:>4}  {:>3}  {:>12.3} ± {}  {:<6}",
            r.benchmark, r.mode, r.metrics.samples, r.metrics.score, error, r.metrics.score_unit
        );
    }
    println!();
}

/// Trimmed stdout of a successful `git` invocation.
fn git(args: &[&str]) -> Option<String> {
    let out = std::process::Command::new("git").args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn capture_hardware() -> HardwareInfo {
    HardwareInfo {
        cores: std::thread::available_parallelism().map_or(0, |n| n.get()),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}
