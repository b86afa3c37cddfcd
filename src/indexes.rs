//! Index state control for the event table.
//!
//! Index state is a controlled variable of every benchmark, so each run starts
//! by dropping all known indexes and then creating the configured subset.
//! Absent indexes on drop and present indexes on create are not errors; any
//! other failure aborts the run.

use crate::dialect::Dialect;
use crate::error::{BenchError, Result};
use crate::store::EventStore;
use std::fmt;
use std::str::FromStr;

/// A named secondary index over the event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub const IDX_TIMESTAMP: IndexSpec = IndexSpec {
    name: "idx_timestamp_on_event",
    columns: &["timestamp"],
};

pub const IDX_EMITTED: IndexSpec = IndexSpec {
    name: "idx_emitted_on_event",
    columns: &["emitted"],
};

pub const IDX_TIMESTAMP_AND_EMITTED: IndexSpec = IndexSpec {
    name: "idx_timestamp_and_emitted_on_event",
    columns: &["timestamp", "emitted"],
};

/// Every index the benchmarks know how to create, and therefore reset.
pub const KNOWN_INDEXES: [IndexSpec; 3] = [IDX_TIMESTAMP, IDX_EMITTED, IDX_TIMESTAMP_AND_EMITTED];

/// The set of indexes present on the table while a benchmark runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexConfig {
    pub indexes: Vec<IndexSpec>,
}

impl IndexConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(indexes: &[IndexSpec]) -> Self {
        Self {
            indexes: indexes.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Short label used in benchmark names and report parameters.
    pub fn label(&self) -> String {
        if self.indexes.is_empty() {
            return "none".to_string();
        }
        self.indexes
            .iter()
            .map(|i| short_name(i))
            .collect::<Vec<_>>()
            .join("+")
    }
}

fn short_name(spec: &IndexSpec) -> &'static str {
    match spec.name {
        "idx_timestamp_on_event" => "timestamp",
        "idx_emitted_on_event" => "emitted",
        "idx_timestamp_and_emitted_on_event" => "timestamp_and_emitted",
        other => other,
    }
}

fn lookup(token: &str) -> Option<IndexSpec> {
    KNOWN_INDEXES
        .iter()
        .copied()
        .find(|spec| spec.name == token || short_name(spec) == token)
}

impl FromStr for IndexConfig {
    type Err = BenchError;

    /// Parse `none` or a comma-separated list of short or full index names.
    fn from_str(s: &str) -> Result<Self> {
        let mut indexes = Vec::new();
        for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token.eq_ignore_ascii_case("none") {
                continue;
            }
            let spec = lookup(&token.to_ascii_lowercase()).ok_or_else(|| {
                BenchError::Configuration(format!("unknown index `{token}`"))
            })?;
            if !indexes.contains(&spec) {
                indexes.push(spec);
            }
        }
        Ok(Self { indexes })
    }
}

impl fmt::Display for IndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Drop each named index if it exists.
pub fn reset_indexes(
    store: &dyn EventStore,
    dialect: Dialect,
    table: &str,
    names: &[&str],
) -> Result<()> {
    let present = if dialect.drop_requires_lookup() {
        Some(
            store
                .index_names(table)
                .map_err(|e| BenchError::schema(format!("list indexes on {table}"), e))?,
        )
    } else {
        None
    };

    for name in names {
        if let Some(present) = &present {
            if !present.iter().any(|p| p == name) {
                log::debug!("Index {} not present, nothing to drop.", name);
                continue;
            }
        }
        let sql = dialect.drop_index(table, name);
        log::debug!("{}", sql);
        store.execute(&sql).map_err(|e| BenchError::schema(sql.clone(), e))?;
    }
    Ok(())
}

/// Create a named index unless it already exists.
pub fn create_index(
    store: &dyn EventStore,
    dialect: Dialect,
    name: &str,
    table: &str,
    columns: &[&str],
) -> Result<()> {
    if dialect.create_requires_lookup() {
        let present = store
            .index_names(table)
            .map_err(|e| BenchError::schema(format!("list indexes on {table}"), e))?;
        if present.iter().any(|p| p == name) {
            log::debug!("Index {} already present.", name);
            return Ok(());
        }
    }
    let sql = dialect.create_index(table, name, columns);
    log::debug!("{}", sql);
    store.execute(&sql).map_err(|e| BenchError::schema(sql.clone(), e))
}

/// Reset every known index, then create the ones in `config`.
pub fn apply_index_config(
    store: &dyn EventStore,
    dialect: Dialect,
    table: &str,
    config: &IndexConfig,
) -> Result<()> {
    let names: Vec<&str> = KNOWN_INDEXES.iter().map(|i| i.name).collect();
    reset_indexes(store, dialect, table, &names)?;
    for spec in &config.indexes {
        create_index(store, dialect, spec.name, table, spec.columns)?;
    }
    log::info!("Index configuration on {}: {}", table, config);
    Ok(())
}
