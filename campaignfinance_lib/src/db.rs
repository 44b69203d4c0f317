//! SQLite storage for campaign finance data.

use std::path::Path;
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

use crate::similarity;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("timed out after {0:?} waiting for a database connection")]
    PoolTimeout(Duration),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("invalid pool config: {0}")]
    PoolConfig(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
    #[error("invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },
}

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS contributors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    zip_code TEXT NOT NULL DEFAULT '',
    city TEXT,
    state TEXT,
    employer TEXT,
    occupation TEXT
);
CREATE TABLE IF NOT EXISTS committees (
    sboe_id TEXT PRIMARY KEY,
    committee_name TEXT NOT NULL,
    candidate_name TEXT,
    office TEXT,
    party TEXT
);
CREATE TABLE IF NOT EXISTS contributions (
    id INTEGER PRIMARY KEY,
    contributor_id TEXT NOT NULL,
    committee_sboe_id TEXT NOT NULL,
    amount REAL NOT NULL,
    date_occurred TEXT NOT NULL,
    form_of_payment TEXT,
    purpose TEXT,
    FOREIGN KEY (contributor_id) REFERENCES contributors(id),
    FOREIGN KEY (committee_sboe_id) REFERENCES committees(sboe_id)
);
CREATE INDEX IF NOT EXISTS idx_contributions_committee
    ON contributions (committee_sboe_id, date_occurred);
CREATE INDEX IF NOT EXISTS idx_contributions_contributor
    ON contributions (contributor_id, date_occurred);
CREATE INDEX IF NOT EXISTS idx_committees_sboe_upper
    ON committees (upper(sboe_id));
";

/// Apply per-connection settings and register the `similarity(a, b)` SQL
/// function used by name search.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    conn.create_scalar_function(
        "similarity",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let left: Option<String> = ctx.get(0)?;
            let right: Option<String> = ctx.get(1)?;
            Ok(match (left, right) {
                (Some(l), Some(r)) => similarity::similarity(&l, &r),
                _ => 0.0,
            })
        },
    )?;
    Ok(())
}

/// Single owned connection, used for schema setup and bulk import.
///
/// Request handling goes through [`crate::pool::SqlitePool`] instead.
pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn init(&self) -> Result<(), DbError> {
        init_schema(&self.conn)
    }
}

/// Create tables and indexes if missing, then stamp the schema version.
pub fn init_schema(conn: &Connection) -> Result<(), DbError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    conn.execute_batch(SCHEMA)?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        db
    }

    fn table_names(db: &Db) -> Vec<String> {
        let mut stmt = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .expect("prepare");
        stmt.query_map([], |row| row.get::<_, String>(0))
            .expect("query")
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_init_creates_tables() {
        let db = open_test_db();
        assert_eq!(
            table_names(&db),
            vec!["committees", "contributions", "contributors"]
        );
    }

    #[test]
    fn test_init_is_idempotent_and_sets_version() {
        let db = open_test_db();
        db.init().expect("second init");
        let version: i32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("user_version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_similarity_function_registered() {
        let db = open_test_db();
        let score: f64 = db
            .conn()
            .query_row("SELECT similarity('Smith', 'smith')", [], |row| row.get(0))
            .expect("similarity");
        assert_eq!(score, 1.0);

        let null_score: f64 = db
            .conn()
            .query_row("SELECT similarity(NULL, 'smith')", [], |row| row.get(0))
            .expect("similarity with null");
        assert_eq!(null_score, 0.0);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = open_test_db();
        let result = db.conn().execute(
            "INSERT INTO contributions (contributor_id, committee_sboe_id, amount, date_occurred)
             VALUES ('missing', 'missing', 10.0, '2020-01-01')",
            [],
        );
        assert!(result.is_err(), "orphan contribution should be rejected");
    }
}
