//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rusqlite::{params, Connection};

use crate::db::{init_schema, DbError};
use crate::pool::{Handle, HandleProvider, PoolConfig, PooledConnection, SqlitePool};

/// A pool over a fresh shared-cache in-memory database, without schema.
pub fn memory_pool() -> SqlitePool {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut config = PoolConfig::new(format!(
        "file:cf_unit_{}_{}?mode=memory&cache=shared",
        std::process::id(),
        n
    ));
    config.max_size = 4;
    config.acquire_timeout = Duration::from_millis(200);
    SqlitePool::new(config).expect("open memory pool")
}

/// Create the schema and load a small fixed data set.
///
/// Contributors: C1 "Smith" (27601), C2 "Smithe" (27602), C3 "Smyth"
/// (28801), C4 "Jane Roe" (27601), C5 "Zed Nobody" (no contributions).
/// Committees: STA-0001 Jane Doe / Governor, STA-0002 Bob Roe / Senate,
/// STA-0003 Citizens for Parks (no candidate).
pub fn seed_sample_data(pool: &SqlitePool) {
    let handle = Handle::acquire(pool).expect("acquire seed handle");
    init_schema(&handle).expect("init schema");
    insert_sample_rows(&handle);
}

fn insert_sample_rows(conn: &Connection) {
    let contributors = [
        ("C1", "Smith", "27601-1234"),
        ("C2", "Smithe", "27602"),
        ("C3", "Smyth", "28801"),
        ("C4", "Jane Roe", "27601-9999"),
        ("C5", "Zed Nobody", "28801"),
    ];
    for (id, name, zip) in contributors {
        conn.execute(
            "INSERT INTO contributors (id, name, zip_code) VALUES (?1, ?2, ?3)",
            params![id, name, zip],
        )
        .expect("insert contributor");
    }

    let committees = [
        ("STA-0001", "Friends of Jane Doe", Some("Jane Doe"), Some("Governor")),
        ("STA-0002", "Committee to Elect Bob Roe", Some("Bob Roe"), Some("Senate")),
        ("STA-0003", "Citizens for Parks", None, None),
    ];
    for (id, name, candidate, office) in committees {
        conn.execute(
            "INSERT INTO committees (sboe_id, committee_name, candidate_name, office)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, name, candidate, office],
        )
        .expect("insert committee");
    }

    let contributions = [
        (1, "C1", "STA-0001", 100.0, "2020-03-01"),
        (2, "C2", "STA-0001", 50.0, "2020-01-15"),
        (3, "C4", "STA-0001", 25.0, "2019-11-02"),
        (4, "C1", "STA-0002", 200.0, "2020-06-30"),
        (5, "C3", "STA-0002", 75.0, "2021-02-10"),
        (6, "C4", "STA-0003", 10.0, "2020-09-09"),
        (7, "C1", "STA-0001", 33.0, "2020-03-01"),
    ];
    for (id, contributor, committee, amount, date) in contributions {
        conn.execute(
            "INSERT INTO contributions (id, contributor_id, committee_sboe_id, amount, date_occurred)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, contributor, committee, amount, date],
        )
        .expect("insert contribution");
    }
}

/// Wraps a provider and counts checkouts and checkins.
pub struct CountingProvider<'a> {
    inner: &'a dyn HandleProvider,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl<'a> CountingProvider<'a> {
    pub fn new(inner: &'a dyn HandleProvider) -> Self {
        Self {
            inner,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl HandleProvider for CountingProvider<'_> {
    fn checkout(&self) -> Result<PooledConnection, DbError> {
        let conn = self.inner.checkout()?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(conn)
    }

    fn checkin(&self, conn: PooledConnection) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.checkin(conn);
    }
}
