//! DuckDB backend.
//!
//! Ids come from a sequence since DuckDB has no autoincrement column.

use super::{EventStore, StoreResult};
use crate::error::StoreError;
use crate::event::Event;
use duckdb::types::Value;
use duckdb::{params, Connection, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CREATE_EVENT_TABLE: &str = "CREATE SEQUENCE IF NOT EXISTS event_id_seq START 1;
CREATE TABLE IF NOT EXISTS event (
    id          BIGINT PRIMARY KEY DEFAULT nextval('event_id_seq'),
    destination VARCHAR,
    payload     VARCHAR,
    timestamp   BIGINT  NOT NULL,
    emitted     BOOLEAN NOT NULL
);";

const INSERT_NEW: &str =
    "INSERT INTO event (destination, payload, timestamp, emitted) VALUES (?, ?, ?, ?)";

const INSERT_RETURNING_ID: &str = "INSERT INTO event (destination, payload, timestamp, emitted)
     VALUES (?, ?, ?, ?) RETURNING id";

const UPSERT: &str = "INSERT OR REPLACE INTO event (id, destination, payload, timestamp, emitted)
     VALUES (?, ?, ?, ?, ?)";

pub struct DuckDbStore {
    conn: Mutex<Connection>,
}

impl DuckDbStore {
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(CREATE_EVENT_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn row_to_event(row: &Row<'_>) -> duckdb::Result<Event> {
    Ok(Event {
        id: row.get("id")?,
        destination: row.get("destination")?,
        payload: row.get("payload")?,
        timestamp: row.get("timestamp")?,
        emitted: row.get("emitted")?,
    })
}

/// Write one event. With `returning`, a new row reports the id the sequence
/// gave it.
fn write_event(
    tx: &Transaction<'_>,
    e: &Event,
    returning: bool,
) -> duckdb::Result<Option<i64>> {
    match e.id {
        None if returning => tx
            .prepare_cached(INSERT_RETURNING_ID)?
            .query_row(params![e.destination, e.payload, e.timestamp, e.emitted], |r| {
                r.get(0)
            })
            .map(Some),
        None => {
            tx.prepare_cached(INSERT_NEW)?
                .execute(params![e.destination, e.payload, e.timestamp, e.emitted])?;
            Ok(None)
        }
        Some(id) => {
            tx.prepare_cached(UPSERT)?
                .execute(params![id, e.destination, e.payload, e.timestamp, e.emitted])?;
            Ok(None)
        }
    }
}

impl EventStore for DuckDbStore {
    fn backend(&self) -> &str {
        "duckdb"
    }

    fn insert_batch(&self, events: &[Event]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for e in events {
            write_event(&tx, e, false)?;
        }
        tx.commit()?;
        Ok(events.len())
    }

    fn insert_assigning_ids(&self, events: &mut [Event]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut assigned = Vec::with_capacity(events.len());
        for e in events.iter() {
            assigned.push(write_event(&tx, e, true)?);
        }
        tx.commit()?;
        for (e, id) in events.iter_mut().zip(assigned) {
            if id.is_some() {
                e.id = id;
            }
        }
        Ok(events.len())
    }

    fn execute(&self, sql: &str) -> StoreResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn query_rows(&self, sql: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut consumed = 0usize;
        while let Some(row) = rows.next()? {
            for i in 0..row.as_ref().column_count() {
                let value: Value = row.get(i)?;
                std::hint::black_box(value);
            }
            consumed += 1;
        }
        Ok(consumed)
    }

    fn fetch_events(&self, sql: &str) -> StoreResult<Vec<Event>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let events = stmt
            .query_map([], row_to_event)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM event", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    fn delete_all(&self) -> StoreResult<()> {
        self.lock()?.execute("DELETE FROM event", [])?;
        Ok(())
    }

    fn index_names(&self, table: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT index_name FROM duckdb_indexes() WHERE table_name = ? ORDER BY index_name",
        )?;
        let names = stmt
            .query_map([table], |r| r.get(0))?
            .collect::<duckdb::Result<Vec<String>>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureGenerator, TimestampMode};

    fn small_batch(n: usize) -> Vec<Event> {
        FixtureGenerator::new(TimestampMode::Fixed)
            .with_payload_len(16)
            .generate(n)
    }

    #[test]
    fn insert_assigning_ids_reads_sequence_values() {
        let store = DuckDbStore::open_in_memory().unwrap();
        let mut batch = small_batch(5);
        store.insert_assigning_ids(&mut batch).unwrap();
        let ids: Vec<i64> = batch.iter().map(|e| e.id.unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        store.insert_assigning_ids(&mut batch).unwrap();
        assert_eq!(store.count().unwrap(), 5);
    }

    #[test]
    fn query_rows_reads_projected_columns_only() {
        let store = DuckDbStore::open_in_memory().unwrap();
        store.insert_batch(&small_batch(4)).unwrap();
        assert_eq!(store.query_rows("SELECT id FROM event").unwrap(), 4);
        assert_eq!(store.query_rows("SELECT * FROM event").unwrap(), 4);
    }
}
