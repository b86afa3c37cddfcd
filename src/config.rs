//! Run configuration loaded from a TOML file.
//!
//! The file mirrors the dotted key names (`benchmark.test.iterations`,
//! `datasource.url`, ...), written either as dotted keys or as tables. Keys
//! that are absent fall back to the defaults below. Values that are present
//! but malformed are configuration errors; nothing is silently replaced by a
//! default.

use crate::dialect::Dialect;
use crate::error::{BenchError, Result};
use crate::event::{DEFAULT_DESTINATION, DEFAULT_PAYLOAD_LEN, PAYLOAD_CAPACITY};
use crate::indexes::IndexConfig;
use crate::report::ResultFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---- TOML file ----

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    benchmark: BenchmarkSection,
    datasource: DatasourceSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BenchmarkSection {
    warmup: WarmupSection,
    test: TestSection,
    global: GlobalSection,
    /// `none` or a comma-separated list of index names.
    indexes: Option<String>,
    insert: InsertSection,
    query: QuerySection,
    payload: PayloadSection,
    destination: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WarmupSection {
    iterations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TestSection {
    iterations: Option<usize>,
    threads: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GlobalSection {
    resultfileprefix: Option<String>,
    resultformat: Option<String>,
    resultdir: Option<PathBuf>,
    gc: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct InsertSection {
    events: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct QuerySection {
    events: Option<usize>,
    repetitions: Option<usize>,
    limit: Option<usize>,
    forupdate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PayloadSection {
    length: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DatasourceSection {
    url: Option<String>,
}

/// Parse a string-valued key with its `FromStr` impl.
fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| BenchError::Configuration(format!("invalid {key} = `{raw}`: {e}"))),
    }
}

/// Runner-level parameters: iteration counts, concurrency and output.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub warmup_iterations: usize,
    pub measurement_iterations: usize,
    pub threads: usize,
    pub result_prefix: String,
    pub result_format: ResultFormat,
    pub result_dir: PathBuf,
    pub force_gc: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            warmup_iterations: 5,
            measurement_iterations: 5,
            threads: 1,
            result_prefix: "jmh-".to_string(),
            result_format: ResultFormat::Json,
            result_dir: PathBuf::from("target"),
            force_gc: true,
        }
    }
}

/// Workload parameters shared by the insert and query suites.
#[derive(Debug, Clone)]
pub struct SuiteSettings {
    pub indexes: IndexConfig,
    pub insert_events: usize,
    pub query_events: usize,
    pub query_repetitions: usize,
    pub query_limit: usize,
    pub for_update: bool,
    pub payload_len: usize,
    pub destination: String,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            indexes: IndexConfig::none(),
            insert_events: 50_000,
            query_events: 100_000,
            query_repetitions: 100,
            query_limit: 500,
            for_update: true,
            payload_len: DEFAULT_PAYLOAD_LEN,
            destination: DEFAULT_DESTINATION.to_string(),
        }
    }
}

/// Everything a run needs, resolved once before any benchmark starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub options: RunOptions,
    pub suite: SuiteSettings,
    pub datasource: String,
    pub dialect: Dialect,
}

impl Default for RunConfig {
    fn default() -> Self {
        let datasource = "sqlite::memory:".to_string();
        Self {
            options: RunOptions::default(),
            suite: SuiteSettings::default(),
            dialect: Dialect::from_url(&datasource),
            datasource,
        }
    }
}

impl RunConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            BenchError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&text)
            .map_err(|e| BenchError::Configuration(format!("{}: {e}", path.display())))?;
        Self::from_file(file)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| BenchError::Configuration(e.to_string()))?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let d = RunConfig::default();
        let b = file.benchmark;

        let options = RunOptions {
            warmup_iterations: b.warmup.iterations.unwrap_or(d.options.warmup_iterations),
            measurement_iterations: b
                .test
                .iterations
                .unwrap_or(d.options.measurement_iterations),
            threads: b.test.threads.unwrap_or(d.options.threads),
            result_prefix: b
                .global
                .resultfileprefix
                .unwrap_or(d.options.result_prefix),
            result_format: parse_value(
                "benchmark.global.resultformat",
                b.global.resultformat,
                d.options.result_format,
            )?,
            result_dir: b.global.resultdir.unwrap_or(d.options.result_dir),
            force_gc: b.global.gc.unwrap_or(d.options.force_gc),
        };

        let suite = SuiteSettings {
            indexes: parse_value("benchmark.indexes", b.indexes, d.suite.indexes)?,
            insert_events: b.insert.events.unwrap_or(d.suite.insert_events),
            query_events: b.query.events.unwrap_or(d.suite.query_events),
            query_repetitions: b.query.repetitions.unwrap_or(d.suite.query_repetitions),
            query_limit: b.query.limit.unwrap_or(d.suite.query_limit),
            for_update: b.query.forupdate.unwrap_or(d.suite.for_update),
            payload_len: b.payload.length.unwrap_or(d.suite.payload_len),
            destination: b.destination.unwrap_or(d.suite.destination),
        };

        let datasource = file.datasource.url.unwrap_or(d.datasource);
        let config = Self {
            options,
            suite,
            dialect: Dialect::from_url(&datasource),
            datasource,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-derive the dialect after the datasource was overridden.
    pub fn set_datasource(&mut self, url: &str) {
        self.datasource = url.to_string();
        self.dialect = Dialect::from_url(url);
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BenchError::Configuration(msg));
        if self.options.measurement_iterations == 0 {
            return invalid(format!("benchmark.test.iterations must be at least 1"));
        }
        if self.options.threads == 0 {
            return invalid(format!("benchmark.test.threads must be at least 1"));
        }
        if self.suite.payload_len > PAYLOAD_CAPACITY {
            return invalid(format!(
                "benchmark.payload.length={} exceeds the column capacity of {PAYLOAD_CAPACITY}",
                self.suite.payload_len
            ));
        }
        if self.suite.query_limit == 0 {
            return invalid(format!("benchmark.query.limit must be at least 1"));
        }
        if self.datasource.trim().is_empty() {
            return invalid(format!("datasource.url is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexes::{IDX_EMITTED, IDX_TIMESTAMP};

    #[test]
    fn defaults_when_empty() {
        let cfg = RunConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.options.warmup_iterations, 5);
        assert_eq!(cfg.options.measurement_iterations, 5);
        assert_eq!(cfg.options.threads, 1);
        assert_eq!(cfg.options.result_prefix, "jmh-");
        assert_eq!(cfg.options.result_format, ResultFormat::Json);
        assert_eq!(cfg.suite.payload_len, 4000);
        assert_eq!(cfg.suite.query_limit, 500);
        assert_eq!(cfg.datasource, "sqlite::memory:");
        assert_eq!(cfg.dialect, Dialect::Generic);
        assert!(cfg.suite.indexes.is_empty());
    }

    #[test]
    fn reads_dotted_keys() {
        let cfg = RunConfig::from_toml_str(
            "# comment\n\
             benchmark.test.iterations = 3\n\
             benchmark.global.resultformat = \"scsv\"\n\
             datasource.url = \"jdbc:mysql://localhost/jmh\"\n\
             benchmark.indexes = \"timestamp\"\n\
             benchmark.global.gc = false\n",
        )
        .unwrap();
        assert_eq!(cfg.options.measurement_iterations, 3);
        assert_eq!(cfg.options.result_format, ResultFormat::Scsv);
        assert_eq!(cfg.dialect, Dialect::MySqlLike);
        assert_eq!(cfg.suite.indexes.indexes, vec![IDX_TIMESTAMP]);
        assert!(!cfg.options.force_gc);
    }

    #[test]
    fn reads_tables() {
        let cfg = RunConfig::from_toml_str(
            r#"
            [benchmark]
            indexes = "timestamp,emitted"
            destination = "orders"

            [benchmark.test]
            threads = 4

            [benchmark.query]
            limit = 50
            forupdate = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.options.threads, 4);
        assert_eq!(cfg.suite.indexes.indexes, vec![IDX_TIMESTAMP, IDX_EMITTED]);
        assert_eq!(cfg.suite.destination, "orders");
        assert_eq!(cfg.suite.query_limit, 50);
        assert!(!cfg.suite.for_update);
    }

    #[test]
    fn datasource_with_colons_is_kept_whole() {
        let cfg = RunConfig::from_toml_str(
            "datasource.url = \"sqlite::memory:\"\n\
             benchmark.global.resultdir = \"C:/bench/out\"\n",
        )
        .unwrap();
        assert_eq!(cfg.datasource, "sqlite::memory:");
        assert_eq!(cfg.options.result_dir, PathBuf::from("C:/bench/out"));

        let cfg =
            RunConfig::from_toml_str("datasource.url = \"sqlite:/tmp/a:b/events.db\"\n").unwrap();
        assert_eq!(cfg.datasource, "sqlite:/tmp/a:b/events.db");
    }

    #[test]
    fn malformed_value_is_configuration_error() {
        for text in [
            "benchmark.warmup.iterations = \"five\"\n",
            "benchmark.warmup.iterations = -1\n",
            "benchmark.global.resultformat = \"xml\"\n",
            "benchmark.indexes = \"primary\"\n",
            "benchmark.test.itrations = 3\n",
        ] {
            let err = RunConfig::from_toml_str(text).unwrap_err();
            assert!(matches!(err, BenchError::Configuration(_)), "{text}");
        }
    }

    #[test]
    fn rejects_zero_iterations_and_threads() {
        assert!(RunConfig::from_toml_str("benchmark.test.iterations = 0\n").is_err());
        assert!(RunConfig::from_toml_str("benchmark.test.threads = 0\n").is_err());
    }

    #[test]
    fn rejects_oversized_payload() {
        assert!(RunConfig::from_toml_str("benchmark.payload.length = 5000\n").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchmark.toml");
        std::fs::write(&path, "benchmark.query.repetitions = 7\n").unwrap();
        assert_eq!(RunConfig::load(&path).unwrap().suite.query_repetitions, 7);
        assert!(RunConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn set_datasource_updates_dialect() {
        let mut cfg = RunConfig::default();
        cfg.set_datasource("jdbc:sqlserver://localhost");
        assert_eq!(cfg.dialect, Dialect::SqlServerLike);
    }
}
