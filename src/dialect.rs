//! SQL dialects and the statement templates that differ between them.
//!
//! The dialect is resolved once from the connection descriptor. Everything
//! downstream asks the dialect for a finished statement instead of branching
//! on engine names.

use std::fmt;

/// Descriptor prefixes served by a bundled driver.
const BUNDLED_SCHEMES: [&str; 2] = ["sqlite:", "duckdb:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// H2, Postgres, SQLite, DuckDB: `DROP INDEX IF EXISTS`, `LIMIT n`.
    Generic,
    /// MySQL/MariaDB: no `IF [NOT] EXISTS` on index DDL, `LIMIT n`.
    MySqlLike,
    /// SQL Server: table-qualified index drops, `TOP n`, table lock hints.
    SqlServerLike,
}

impl Dialect {
    /// Pick the dialect for a connection descriptor.
    ///
    /// Bundled backends (`sqlite:`, `duckdb:`) are always `Generic`, whatever
    /// their path contains. Other descriptors such as `jdbc:mysql://host/db`
    /// are matched on known engine names.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if BUNDLED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
            Self::Generic
        } else if lower.contains("mysql") || lower.contains("mariadb") {
            Self::MySqlLike
        } else if lower.contains("sqlserver") {
            Self::SqlServerLike
        } else {
            Self::Generic
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::MySqlLike => "mysql",
            Self::SqlServerLike => "sqlserver",
        }
    }

    /// Whether dropping an index needs an explicit existence check first.
    pub fn drop_requires_lookup(&self) -> bool {
        matches!(self, Self::MySqlLike)
    }

    /// Whether creating an index needs an explicit existence check first.
    pub fn create_requires_lookup(&self) -> bool {
        matches!(self, Self::MySqlLike)
    }

    pub fn drop_index(&self, table: &str, index: &str) -> String {
        match self {
            Self::Generic => format!("DROP INDEX IF EXISTS {index}"),
            Self::MySqlLike => format!("ALTER TABLE {table} DROP INDEX {index}"),
            Self::SqlServerLike => format!("DROP INDEX IF EXISTS {table}.{index}"),
        }
    }

    pub fn create_index(&self, table: &str, index: &str, columns: &[&str]) -> String {
        let cols = columns.join(", ");
        match self {
            Self::Generic => format!("CREATE INDEX IF NOT EXISTS {index} ON {table} ({cols})"),
            Self::MySqlLike => format!("CREATE INDEX {index} ON {table} ({cols})"),
            Self::SqlServerLike => format!(
                "IF NOT EXISTS (SELECT 1 FROM sys.indexes \
                 WHERE name = '{index}' AND object_id = OBJECT_ID('{table}')) \
                 CREATE INDEX {index} ON {table} ({cols})"
            ),
        }
    }

    /// Literal for `false` in a boolean column predicate.
    fn false_literal(&self) -> &'static str {
        match self {
            Self::Generic | Self::MySqlLike => "FALSE",
            Self::SqlServerLike => "0",
        }
    }

    /// Build a capped `SELECT *` over `table`.
    ///
    /// `unemitted_only` filters on `emitted = false`, `order_by_timestamp`
    /// sorts ascending, and `lock_rows` adds the dialect's row-locking clause.
    pub fn capped_select(
        &self,
        table: &str,
        limit: usize,
        unemitted_only: bool,
        order_by_timestamp: bool,
        lock_rows: bool,
    ) -> String {
        let filter = if unemitted_only {
            format!(" WHERE emitted = {}", self.false_literal())
        } else {
            String::new()
        };
        let order = if order_by_timestamp {
            " ORDER BY timestamp ASC"
        } else {
            ""
        };

        match self {
            Self::Generic | Self::MySqlLike => {
                let lock = if lock_rows { " FOR UPDATE" } else { "" };
                format!("SELECT * FROM {table}{filter}{order} LIMIT {limit}{lock}")
            }
            Self::SqlServerLike => {
                let hint = if lock_rows { " WITH (UPDLOCK, ROWLOCK)" } else { "" };
                format!("SELECT TOP {limit} * FROM {table}{hint}{filter}{order}")
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_from_descriptor() {
        assert_eq!(Dialect::from_url("jdbc:mysql://localhost/jmh"), Dialect::MySqlLike);
        assert_eq!(
            Dialect::from_url("jdbc:sqlserver://localhost;databaseName=jmh"),
            Dialect::SqlServerLike
        );
        assert_eq!(Dialect::from_url("jdbc:postgresql://localhost/jmh"), Dialect::Generic);
        assert_eq!(Dialect::from_url("jdbc:h2:mem:jmh"), Dialect::Generic);
        assert_eq!(Dialect::from_url("sqlite::memory:"), Dialect::Generic);
        assert_eq!(Dialect::from_url("MYSQL://x"), Dialect::MySqlLike);
    }

    #[test]
    fn bundled_backends_ignore_engine_names_in_path() {
        assert_eq!(
            Dialect::from_url("sqlite:/tmp/bench/mysql-compare.db"),
            Dialect::Generic
        );
        assert_eq!(
            Dialect::from_url("SQLite:/data/sqlserver/events.db"),
            Dialect::Generic
        );
        assert_eq!(Dialect::from_url("duckdb:/tmp/mysql.duckdb"), Dialect::Generic);
    }

    #[test]
    fn drop_index_syntax() {
        assert_eq!(
            Dialect::Generic.drop_index("event", "idx_a"),
            "DROP INDEX IF EXISTS idx_a"
        );
        assert_eq!(
            Dialect::MySqlLike.drop_index("event", "idx_a"),
            "ALTER TABLE event DROP INDEX idx_a"
        );
        assert_eq!(
            Dialect::SqlServerLike.drop_index("jmh.event", "idx_a"),
            "DROP INDEX IF EXISTS jmh.event.idx_a"
        );
    }

    #[test]
    fn create_index_syntax() {
        assert_eq!(
            Dialect::Generic.create_index("event", "idx_ab", &["a", "b"]),
            "CREATE INDEX IF NOT EXISTS idx_ab ON event (a, b)"
        );
        assert_eq!(
            Dialect::MySqlLike.create_index("event", "idx_a", &["a"]),
            "CREATE INDEX idx_a ON event (a)"
        );
        assert_eq!(
            Dialect::SqlServerLike.create_index("jmh.event", "idx_a", &["a"]),
            "IF NOT EXISTS (SELECT 1 FROM sys.indexes \
             WHERE name = 'idx_a' AND object_id = OBJECT_ID('jmh.event')) \
             CREATE INDEX idx_a ON jmh.event (a)"
        );
    }

    #[test]
    fn capped_select_generic() {
        assert_eq!(
            Dialect::Generic.capped_select("event", 500, false, false, true),
            "SELECT * FROM event LIMIT 500 FOR UPDATE"
        );
        assert_eq!(
            Dialect::Generic.capped_select("event", 500, true, true, false),
            "SELECT * FROM event WHERE emitted = FALSE ORDER BY timestamp ASC LIMIT 500"
        );
    }

    #[test]
    fn capped_select_sqlserver_uses_top() {
        assert_eq!(
            Dialect::SqlServerLike.capped_select("event", 500, true, true, true),
            "SELECT TOP 500 * FROM event WITH (UPDLOCK, ROWLOCK) WHERE emitted = 0 ORDER BY timestamp ASC"
        );
    }
}
