//! Command-line entry point for the event table benchmarks.
//!
//! Usage:
//! ```text
//! sql-event-bench --suite query --indexes timestamp --iterations 10
//! sql-event-bench --config bench.toml --datasource sqlite:/tmp/events.db
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::LevelFilter;
use sql_event_benchmarks::config::RunConfig;
use sql_event_benchmarks::indexes::IndexConfig;
use sql_event_benchmarks::logging::initialize_logger;
use sql_event_benchmarks::report::{print_summary, ResultFormat};
use sql_event_benchmarks::runner::{HarnessContext, Runner};
use sql_event_benchmarks::store::open_store;
use sql_event_benchmarks::suites::{self, Suite};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "benchmark.toml";

#[derive(Parser, Debug)]
#[command(
    name = "sql-event-bench",
    about = "Average-time insert and query benchmarks against an event table"
)]
struct Args {
    /// TOML config file; `benchmark.toml` is used when present.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Which benchmarks to run: insert, query or all.
    #[arg(long, default_value = "all")]
    suite: Suite,

    /// Connection descriptor, e.g. `sqlite::memory:` or `sqlite:/tmp/events.db`.
    #[arg(long)]
    datasource: Option<String>,

    /// Indexes to create after the reset: `none` or a comma-separated list.
    #[arg(long)]
    indexes: Option<IndexConfig>,

    #[arg(long)]
    warmup: Option<usize>,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    /// Result file format: json, csv, scsv or latex.
    #[arg(long)]
    format: Option<ResultFormat>,

    /// Directory the result file is written to.
    #[arg(long)]
    result_dir: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write the log to this file.
    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level: LevelFilter = args
        .log_level
        .parse()
        .map_err(|_| anyhow!("invalid log level `{}`", args.log_level))?;
    initialize_logger(level, args.log_file.as_deref())?;

    let config = load_config(&args)?;
    log::info!(
        "Datasource {} ({} dialect), indexes: {}",
        config.datasource,
        config.dialect,
        config.suite.indexes
    );

    let store = open_store(&config.datasource)
        .with_context(|| format!("opening {}", config.datasource))?;
    let mut ctx = HarnessContext::new(store, config.dialect, config.suite.clone());
    let registrations = suites::registrations(args.suite, &ctx);

    let mut runner = Runner::new(config.options.clone());
    let outcome = runner.run(&mut ctx, &registrations)?;

    print_summary(&outcome.results);
    Ok(())
}

fn load_config(args: &Args) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => {
            RunConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None if Path::new(DEFAULT_CONFIG).exists() => RunConfig::load(DEFAULT_CONFIG)
            .with_context(|| format!("loading {DEFAULT_CONFIG}"))?,
        None => RunConfig::default(),
    };

    if let Some(url) = &args.datasource {
        config.set_datasource(url);
    }
    if let Some(indexes) = &args.indexes {
        config.suite.indexes = indexes.clone();
    }
    if let Some(n) = args.warmup {
        config.options.warmup_iterations = n;
    }
    if let Some(n) = args.iterations {
        config.options.measurement_iterations = n;
    }
    if let Some(n) = args.threads {
        config.options.threads = n;
    }
    if let Some(format) = args.format {
        config.options.result_format = format;
    }
    if let Some(dir) = &args.result_dir {
        config.options.result_dir = dir.clone();
    }

    config.validate()?;
    Ok(config)
}
