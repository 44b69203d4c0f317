//! Connection pool and the scoped execution handle.
//!
//! Query code never holds a raw connection: it acquires a [`Handle`] from a
//! [`HandleProvider`], and the handle checks the connection back in when it
//! is dropped. Early returns, `?` propagation and panics all pass through
//! `Drop`, so every acquisition is matched by exactly one release.

use std::ops::Deref;
use std::path::PathBuf;
use std::time::Duration;

use r2d2::{CustomizeConnection, HandleError};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::db::{configure_connection, DbError};

/// Default number of connections kept by [`SqlitePool`].
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Default time to wait for a free connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// A connection checked out of an r2d2 pool. Dropping it returns it.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Source of query-execution handles.
///
/// Implementations hand out connections with [`checkout`](Self::checkout)
/// and take them back with [`checkin`](Self::checkin). Callers should use
/// [`Handle::acquire`] rather than calling these directly.
pub trait HandleProvider: Send + Sync {
    fn checkout(&self) -> Result<PooledConnection, DbError>;
    fn checkin(&self, conn: PooledConnection);
}

/// A pooled connection that is returned to its provider on drop.
pub struct Handle<'p> {
    conn: Option<PooledConnection>,
    provider: &'p dyn HandleProvider,
}

impl<'p> Handle<'p> {
    pub fn acquire(provider: &'p dyn HandleProvider) -> Result<Self, DbError> {
        let conn = provider.checkout()?;
        Ok(Self {
            conn: Some(conn),
            provider,
        })
    }
}

impl Deref for Handle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `Drop` takes the connection out.
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("handle used after release"),
        }
    }
}

impl Drop for Handle<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.provider.checkin(conn);
        }
    }
}

/// Settings for [`SqlitePool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Database path or SQLite URI (`file:name?mode=memory&cache=shared`).
    pub path: PathBuf,
    pub max_size: usize,
    pub acquire_timeout: Duration,
    /// Open connections with `SQLITE_OPEN_READ_ONLY`.
    pub read_only: bool,
}

impl PoolConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: DEFAULT_POOL_SIZE,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            read_only: false,
        }
    }

    fn open_flags(&self) -> OpenFlags {
        let flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.read_only {
            flags | OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            flags | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    }
}

/// Runs [`configure_connection`] on every connection r2d2 opens.
#[derive(Debug)]
struct ConfigureOnAcquire;

impl CustomizeConnection<Connection, rusqlite::Error> for ConfigureOnAcquire {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        configure_connection(conn)?;
        debug!("opened pooled connection");
        Ok(())
    }
}

/// Reports failed connection attempts through `tracing`.
#[derive(Debug)]
struct TracingErrorHandler;

impl HandleError<rusqlite::Error> for TracingErrorHandler {
    fn handle_error(&self, error: rusqlite::Error) {
        warn!(error = %error, "failed to open pooled connection");
    }
}

/// Bounded SQLite connection pool backed by r2d2.
///
/// All `max_size` connections are opened up front and kept for the life of
/// the pool, which also keeps shared-cache in-memory databases alive. When
/// every connection is checked out, `checkout` waits at most
/// `acquire_timeout`.
pub struct SqlitePool {
    inner: r2d2::Pool<SqliteConnectionManager>,
    acquire_timeout: Duration,
}

impl SqlitePool {
    pub fn new(config: PoolConfig) -> Result<Self, DbError> {
        if config.max_size == 0 || config.acquire_timeout.is_zero() {
            return Err(DbError::PoolConfig(
                "max_size and acquire_timeout must be non-zero".to_string(),
            ));
        }
        let manager =
            SqliteConnectionManager::file(&config.path).with_flags(config.open_flags());
        let max_size = u32::try_from(config.max_size).unwrap_or(u32::MAX);

        // `build` opens the connections now, so a bad path fails at startup.
        let inner = r2d2::Pool::builder()
            .max_size(max_size)
            .connection_timeout(config.acquire_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(ConfigureOnAcquire))
            .error_handler(Box::new(TracingErrorHandler))
            .build(manager)?;

        debug!(path = %config.path.display(), max_size, "connection pool ready");
        Ok(Self {
            inner,
            acquire_timeout: config.acquire_timeout,
        })
    }

    /// Number of connections currently idle in the pool.
    pub fn idle_count(&self) -> usize {
        self.inner.state().idle_connections as usize
    }
}

impl HandleProvider for SqlitePool {
    fn checkout(&self) -> Result<PooledConnection, DbError> {
        self.inner.get().map_err(|e| {
            warn!(
                max_size = self.inner.max_size(),
                timeout_ms = self.acquire_timeout.as_millis() as u64,
                error = %e,
                "connection pool exhausted"
            );
            DbError::PoolTimeout(self.acquire_timeout)
        })
    }

    fn checkin(&self, conn: PooledConnection) {
        drop(conn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn memory_config(max_size: usize) -> PoolConfig {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let mut config = PoolConfig::new(format!(
            "file:pool_test_{}_{}?mode=memory&cache=shared",
            std::process::id(),
            n
        ));
        config.max_size = max_size;
        config.acquire_timeout = Duration::from_millis(50);
        config
    }

    #[test]
    fn test_handle_returns_connection_on_drop() {
        let pool = SqlitePool::new(memory_config(2)).expect("pool");
        assert_eq!(pool.idle_count(), 2);
        {
            let handle = Handle::acquire(&pool).expect("acquire");
            let one: i64 = handle
                .query_row("SELECT 1", [], |row| row.get(0))
                .expect("query");
            assert_eq!(one, 1);
            assert_eq!(pool.idle_count(), 1);
        }
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_pool_is_bounded_and_times_out() {
        let pool = SqlitePool::new(memory_config(2)).expect("pool");
        let first = Handle::acquire(&pool).expect("first");
        let second = Handle::acquire(&pool).expect("second");

        match Handle::acquire(&pool) {
            Err(DbError::PoolTimeout(_)) => {}
            Err(other) => panic!("expected pool timeout, got {other}"),
            Ok(_) => panic!("pool handed out more than max_size connections"),
        }

        drop(first);
        let third = Handle::acquire(&pool).expect("acquire after release");
        drop(second);
        drop(third);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_waiting_checkout_wakes_on_release() {
        let mut config = memory_config(1);
        config.acquire_timeout = Duration::from_secs(5);
        let pool = Arc::new(SqlitePool::new(config).expect("pool"));

        let conn = pool.checkout().expect("checkout");
        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                let started = Instant::now();
                let acquired = Handle::acquire(pool.as_ref()).is_ok();
                (acquired, started.elapsed())
            })
        };
        std::thread::sleep(Duration::from_millis(20));
        pool.checkin(conn);

        let (acquired, waited) = waiter.join().expect("join waiter");
        assert!(acquired);
        assert!(waited < Duration::from_secs(5), "waiter slept until its deadline");
    }

    #[test]
    fn test_shared_memory_database_visible_across_handles() {
        let pool = SqlitePool::new(memory_config(2)).expect("pool");
        let writer = Handle::acquire(&pool).expect("writer");
        writer
            .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .expect("seed");

        let reader = Handle::acquire(&pool).expect("reader");
        let v: i64 = reader
            .query_row("SELECT v FROM t", [], |row| row.get(0))
            .expect("read");
        assert_eq!(v, 7);
    }

    #[test]
    fn test_pooled_connections_are_configured() {
        let pool = SqlitePool::new(memory_config(1)).expect("pool");
        let handle = Handle::acquire(&pool).expect("acquire");
        let score: f64 = handle
            .query_row("SELECT similarity('Smith', 'SMITH')", [], |row| row.get(0))
            .expect("similarity");
        assert_eq!(score, 1.0);
        let foreign_keys: i64 = handle
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("foreign_keys");
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_read_only_pool_on_missing_file_fails_at_startup() {
        let dir = std::env::temp_dir().join(format!("cf_pool_missing_{}", std::process::id()));
        let mut config = PoolConfig::new(dir.join("absent.db"));
        config.read_only = true;
        config.acquire_timeout = Duration::from_millis(50);
        assert!(matches!(SqlitePool::new(config), Err(DbError::Pool(_))));
    }

    #[test]
    fn test_zero_sized_pool_is_rejected() {
        let mut config = memory_config(1);
        config.max_size = 0;
        assert!(matches!(
            SqlitePool::new(config),
            Err(DbError::PoolConfig(_))
        ));
    }
}
