//! Benchmark comparison tool.
//!
//! Compares two JSON result files and prints the average-time delta for every
//! benchmark present in both.
//!
//! Usage: `cargo run --bin bench-compare -- <baseline.json> <candidate.json>`

use anyhow::{Context, Result};
use clap::Parser;
use sql_event_benchmarks::schema::{BenchmarkMetrics, BenchmarkReport, BenchmarkResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bench-compare", about = "Compare two benchmark JSON reports")]
struct Args {
    baseline: PathBuf,
    candidate: PathBuf,

    /// Deltas within this percentage are reported as unchanged.
    #[arg(long, default_value_t = 1.0)]
    threshold: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let baseline = load_report(&args.baseline)?;
    let candidate = load_report(&args.candidate)?;

    let base_map: HashMap<&str, &BenchmarkResult> = baseline
        .results
        .iter()
        .map(|r| (r.benchmark.as_str(), r))
        .collect();

    eprintln!(
        "Baseline: {} ({}, {})",
        args.baseline.display(),
        baseline.metadata.timestamp,
        baseline.metadata.backend
    );
    eprintln!(
        "Candidate: {} ({}, {})",
        args.candidate.display(),
        candidate.metadata.timestamp,
        candidate.metadata.backend
    );
    eprintln!();

    let width = candidate
        .results
        .iter()
        .map(|r| r.benchmark.len())
        .max()
        .unwrap_or(9)
        .max(9);

    println!(
        "{:<width$} | {:>18} | {:>18} | {:>8}",
        "Benchmark", "Base", "New", "Delta"
    );
    println!("{}", "-".repeat(width + 56));

    let mut matched = 0u32;
    let mut only_cand = 0u32;

    for cand in &candidate.results {
        match base_map.get(cand.benchmark.as_str()) {
            Some(base) => {
                matched += 1;
                print_comparison(&cand.benchmark, width, &base.metrics, &cand.metrics, args.threshold);
            }
            None => only_cand += 1,
        }
    }

    let only_base = baseline
        .results
        .iter()
        .filter(|b| !candidate.results.iter().any(|c| c.benchmark == b.benchmark))
        .count();

    println!("{}", "-".repeat(width + 56));
    println!(
        "Compared: {} | Baseline only: {} | Candidate only: {}",
        matched, only_base, only_cand
    );
    Ok(())
}

fn load_report(path: &Path) -> Result<BenchmarkReport> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn print_comparison(
    name: &str,
    width: usize,
    base: &BenchmarkMetrics,
    cand: &BenchmarkMetrics,
    threshold: f64,
) {
    let delta_pct = if base.score > 0.0 {
        (cand.score - base.score) / base.score * 100.0
    } else {
        0.0
    };

    // Lower average time is better. Overlapping error bars are not a change.
    let hint = if overlaps(base, cand) || delta_pct.abs() <= threshold {
        "~same"
    } else if delta_pct < 0.0 {
        "faster"
    } else {
        "slower"
    };

    println!(
        "{:<width$} | {:>18} | {:>18} | {:>+7.1}% ({})",
        name,
        format_score(base),
        format_score(cand),
        delta_pct,
        hint,
    );
}

fn overlaps(a: &BenchmarkMetrics, b: &BenchmarkMetrics) -> bool {
    match (a.score_confidence, b.score_confidence) {
        (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => a_lo <= b_hi && b_lo <= a_hi,
        _ => false,
    }
}

fn format_score(m: &BenchmarkMetrics) -> String {
    match m.score_error {
        Some(err) => format!("{:.3} ± {:.3} {}", m.score, err, unit_label(&m.score_unit)),
        None => format!("{:.3} {}", m.score, unit_label(&m.score_unit)),
    }
}

fn unit_label(unit: &str) -> &str {
    unit.strip_suffix("/op").unwrap_or(unit)
}
