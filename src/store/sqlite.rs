//! SQLite backend (via rusqlite).
//!
//! One connection guarded by a mutex, shared by every worker. In-memory
//! databases are private to their connection, so a pool would not see the
//! same data anyway.

use super::{EventStore, StoreResult};
use crate::error::StoreError;
use crate::event::Event;
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const CREATE_EVENT_TABLE: &str = "CREATE TABLE IF NOT EXISTS event (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    destination VARCHAR(255),
    payload     VARCHAR(4096),
    timestamp   BIGINT  NOT NULL,
    emitted     BOOLEAN NOT NULL
);";

const INSERT_NEW: &str =
    "INSERT INTO event (destination, payload, timestamp, emitted) VALUES (?1, ?2, ?3, ?4)";

const UPSERT: &str = "INSERT OR REPLACE INTO event (id, destination, payload, timestamp, emitted)
     VALUES (?1, ?2, ?3, ?4, ?5)";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        configure_connection(&conn)?;
        conn.execute_batch(CREATE_EVENT_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Throughput-oriented pragmas. `journal_mode` is ignored for `:memory:`.
pub fn configure_connection(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get("id")?,
        destination: row.get("destination")?,
        payload: row.get("payload")?,
        timestamp: row.get("timestamp")?,
        emitted: row.get("emitted")?,
    })
}

/// Write one event. Returns the new rowid when a row was inserted rather than
/// replaced.
fn write_event(tx: &Transaction<'_>, e: &Event) -> rusqlite::Result<Option<i64>> {
    match e.id {
        None => {
            tx.prepare_cached(INSERT_NEW)?
                .execute(params![e.destination, e.payload, e.timestamp, e.emitted])?;
            Ok(Some(tx.last_insert_rowid()))
        }
        Some(id) => {
            tx.prepare_cached(UPSERT)?
                .execute(params![id, e.destination, e.payload, e.timestamp, e.emitted])?;
            Ok(None)
        }
    }
}

impl EventStore for SqliteStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    fn insert_batch(&self, events: &[Event]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for e in events {
            write_event(&tx, e)?;
        }
        tx.commit()?;
        Ok(events.len())
    }

    fn insert_assigning_ids(&self, events: &mut [Event]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut assigned = Vec::with_capacity(events.len());
        for e in events.iter() {
            assigned.push(write_event(&tx, e)?);
        }
        tx.commit()?;
        // Ids become visible only once the transaction is durable.
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
        let mut stmt = conn.prepare_cached(sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query([])?;
        let mut consumed = 0usize;
        while let Some(row) = rows.next()? {
            for i in 0..columns {
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
            .collect::<rusqlite::Result<Vec<_>>>()?;
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
            "SELECT name FROM sqlite_master
             WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([table], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn release_memory(&self) -> StoreResult<()> {
        self.lock()?.execute_batch("PRAGMA shrink_memory;")?;
        Ok(())
    }
}
