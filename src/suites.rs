//! The insert and query benchmark suites, expressed as runner registrations.
//!
//! Both suites reset the index state to the configured [`IndexConfig`] before
//! touching the fixture, so results for different index sets are comparable.
//!
//! [`IndexConfig`]: crate::indexes::IndexConfig

use crate::error::{BenchError, Result};
use crate::event::EVENT_TABLE;
use crate::fixture::{clear_ids, FixtureGenerator, TimestampMode};
use crate::indexes::apply_index_config;
use crate::runner::{HarnessContext, Registration, SetupLevel};
use crate::workload::{InsertWorkload, QueryShape, QueryWorkload};
use std::fmt;
use std::str::FromStr;

pub const INSERT_BENCHMARK: &str = "insert/insertEvents";

/// Which suites a run includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Insert,
    Query,
    All,
}

impl FromStr for Suite {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "query" => Ok(Self::Query),
            "all" => Ok(Self::All),
            other => Err(BenchError::Configuration(format!(
                "unknown suite `{other}` (insert, query, all)"
            ))),
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Query => "query",
            Self::All => "all",
        })
    }
}

/// Registrations for `suite`, insert before query.
pub fn registrations(suite: Suite, ctx: &HarnessContext) -> Vec<Registration> {
    match suite {
        Suite::Insert => vec![insert_registration(ctx)],
        Suite::Query => query_registrations(ctx),
        Suite::All => {
            let mut all = vec![insert_registration(ctx)];
            all.extend(query_registrations(ctx));
            all
        }
    }
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

/// Batch insert of the whole fixture. Setup runs every iteration because each
/// insert grows the table.
pub fn insert_registration(ctx: &HarnessContext) -> Registration {
    let settings = &ctx.settings;
    Registration::new(
        INSERT_BENCHMARK,
        SetupLevel::Iteration,
        prepare_insert_fixture,
        |ctx: &HarnessContext| {
            let complete = InsertWorkload::new(ctx.store.as_ref()).insert_batch(&ctx.events)?;
            if !complete {
                log::warn!("Store accepted only part of the {} event batch.", ctx.events.len());
            }
            Ok(())
        },
    )
    .with_parameter("indexes", settings.indexes.label())
    .with_parameter("events", settings.insert_events)
    .with_parameter("payloadLength", settings.payload_len)
}

/// Reset indexes, empty the table, and make sure the in-memory batch has the
/// configured size with every id cleared.
pub fn prepare_insert_fixture(ctx: &mut HarnessContext) -> Result<()> {
    apply_index_config(
        ctx.store.as_ref(),
        ctx.dialect,
        EVENT_TABLE,
        &ctx.settings.indexes,
    )?;

    log::info!("Deleting existing events.");
    ctx.store
        .delete_all()
        .map_err(|e| BenchError::workload("delete_all", e))?;

    let expected = ctx.settings.insert_events;
    if ctx.events.len() == expected {
        log::info!("There are the required {} events ready to insert.", expected);
        clear_ids(&mut ctx.events);
    } else {
        log::info!("Creating list of {} events to insert.", expected);
        ctx.events = FixtureGenerator::new(TimestampMode::Jittered)
            .with_destination(&ctx.settings.destination)
            .with_payload_len(ctx.settings.payload_len)
            .generate(expected);
        if ctx.events.len() != expected {
            return Err(BenchError::FixtureMismatch {
                expected: expected as u64,
                actual: ctx.events.len() as u64,
            });
        }
        log::info!("Created list of {} events ready to insert.", ctx.events.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// One registration per query shape, all sharing the same populated table.
pub fn query_registrations(ctx: &HarnessContext) -> Vec<Registration> {
    QueryShape::ALL
        .iter()
        .map(|&shape| query_registration(ctx, shape))
        .collect()
}

pub fn query_registration(ctx: &HarnessContext, shape: QueryShape) -> Registration {
    let settings = &ctx.settings;
    let sql = shape.sql(ctx.dialect, settings.query_limit, ctx.lock_rows);
    let repetitions = settings.query_repetitions;
    log::debug!("{}: {}", shape.benchmark_name(), sql);

    Registration::new(
        format!("query/{}", shape.benchmark_name()),
        SetupLevel::Trial,
        prepare_query_fixture,
        move |ctx: &HarnessContext| {
            QueryWorkload::new(ctx.store.as_ref()).run_query(&sql, repetitions)?;
            Ok(())
        },
    )
    .with_parameter("shape", shape.label())
    .with_parameter("indexes", settings.indexes.label())
    .with_parameter("events", settings.query_events)
    .with_parameter("limit", settings.query_limit)
    .with_parameter("repetitions", repetitions)
}

/// Reset indexes, then keep the table if it already holds the configured
/// number of events; otherwise rebuild it and verify the count.
pub fn prepare_query_fixture(ctx: &mut HarnessContext) -> Result<()> {
    apply_index_config(
        ctx.store.as_ref(),
        ctx.dialect,
        EVENT_TABLE,
        &ctx.settings.indexes,
    )?;

    let expected = ctx.settings.query_events as u64;
    let count = ctx
        .store
        .count()
        .map_err(|e| BenchError::workload("count", e))?;
    if count == expected {
        log::info!("There are the required {} events in the database.", expected);
        return Ok(());
    }

    log::info!("Deleting existing events.");
    ctx.store
        .delete_all()
        .map_err(|e| BenchError::workload("delete_all", e))?;

    log::info!("Creating {} new events.", expected);
    let mut events = FixtureGenerator::new(TimestampMode::Fixed)
        .with_destination(&ctx.settings.destination)
        .with_payload_len(ctx.settings.payload_len)
        .generate(ctx.settings.query_events);
    InsertWorkload::new(ctx.store.as_ref()).persist(&mut events)?;

    let actual = ctx
        .store
        .count()
        .map_err(|e| BenchError::workload("count", e))?;
    log::info!("Total event count is {}.", actual);
    if actual != expected {
        return Err(BenchError::FixtureMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuiteSettings;
    use crate::dialect::Dialect;
    use crate::indexes::{IndexConfig, IDX_TIMESTAMP};
    use crate::store::sqlite::SqliteStore;

    fn context(settings: SuiteSettings) -> HarnessContext {
        HarnessContext::new(
            Box::new(SqliteStore::open_in_memory().unwrap()),
            Dialect::Generic,
            settings,
        )
    }

    fn small() -> SuiteSettings {
        SuiteSettings {
            insert_events: 40,
            query_events: 60,
            query_repetitions: 2,
            query_limit: 10,
            payload_len: 16,
            indexes: IndexConfig::of(&[IDX_TIMESTAMP]),
            ..SuiteSettings::default()
        }
    }

    #[test]
    fn parses_suite_names() {
        assert_eq!("Insert".parse::<Suite>().unwrap(), Suite::Insert);
        assert_eq!("all".parse::<Suite>().unwrap(), Suite::All);
        assert!("delete".parse::<Suite>().is_err());
    }

    #[test]
    fn all_suite_registers_insert_and_three_queries() {
        let ctx = context(small());
        let regs = registrations(Suite::All, &ctx);
        let names: Vec<&str> = regs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "insert/insertEvents",
                "query/pollEventsSelectWhereEmittedOrderByTimestamp",
                "query/pollEventsSelectWhereEmitted",
                "query/pollEventsSelected",
            ]
        );
        assert_eq!(regs[0].level, SetupLevel::Iteration);
        assert!(regs[1..].iter().all(|r| r.level == SetupLevel::Trial));
    }

    #[test]
    fn insert_setup_empties_table_and_reuses_batch() {
        let mut ctx = context(small());
        prepare_insert_fixture(&mut ctx).unwrap();
        assert_eq!(ctx.events.len(), 40);
        let first_payload = ctx.events[0].payload.clone();

        ctx.store.insert_assigning_ids(&mut ctx.events).unwrap();
        assert!(ctx.events.iter().all(|e| e.id.is_some()));
        prepare_insert_fixture(&mut ctx).unwrap();

        assert_eq!(ctx.store.count().unwrap(), 0);
        assert_eq!(ctx.events[0].payload, first_payload);
        assert!(ctx.events.iter().all(|e| e.id.is_none()));
        assert_eq!(
            ctx.store.index_names(EVENT_TABLE).unwrap(),
            vec!["idx_timestamp_on_event".to_string()]
        );
    }

    #[test]
    fn query_setup_builds_then_keeps_table() {
        let mut ctx = context(small());
        prepare_query_fixture(&mut ctx).unwrap();
        assert_eq!(ctx.store.count().unwrap(), 60);

        let sql = "SELECT * FROM event ORDER BY id LIMIT 1";
        let before = ctx.store.fetch_events(sql).unwrap();
        prepare_query_fixture(&mut ctx).unwrap();
        let after = ctx.store.fetch_events(sql).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn query_setup_rebuilds_wrong_sized_table() {
        let mut ctx = context(small());
        let extra = FixtureGenerator::new(TimestampMode::Fixed)
            .with_payload_len(4)
            .generate(5);
        ctx.store.insert_batch(&extra).unwrap();

        prepare_query_fixture(&mut ctx).unwrap();
        assert_eq!(ctx.store.count().unwrap(), 60);
    }
}
