//! Database connection management
//!
//! Provides SQLite connection pooling and management.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use thiserror::Error;

/// Database error types
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Database not initialized")]
    NotInitialized,
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

const PRAGMAS: &str = "PRAGMA foreign_keys = ON;
     PRAGMA synchronous = NORMAL;
     PRAGMA cache_size = -64000;
     PRAGMA temp_store = MEMORY;";

/// Virtual machine steps between deadline checks
const DEADLINE_CHECK_OPS: i32 = 1000;

/// Run `f` with SQLite interrupting any statement still running at `deadline`.
///
/// `Ok(None)` means a statement was interrupted. The handler is removed
/// before the connection goes back to the pool.
pub fn with_deadline<F, T>(conn: &Connection, deadline: Instant, f: F) -> DbResult<Option<T>>
where
    F: FnOnce(&Connection) -> DbResult<T>,
{
    conn.progress_handler(DEADLINE_CHECK_OPS, Some(move || Instant::now() >= deadline));
    let outcome = f(conn);
    conn.progress_handler(0, None::<fn() -> bool>);

    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
            if err.code == ErrorCode::OperationInterrupted =>
        {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl Database {
    /// Create a new database connection pool
    pub fn new<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(|conn| {
                conn.execute_batch(PRAGMAS)?;
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                // Bounds how long a catalog query may block on a locked database
                conn.busy_timeout(Duration::from_secs(5))?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(10)
            .build(manager)?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Create a private in-memory database.
    ///
    /// Every SQLite memory connection is its own database, so the pool holds
    /// exactly one connection.
    pub fn in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Execute a closure with a database connection
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DbResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    /// Execute a closure with a mutable database connection (for transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut rusqlite::Connection) -> DbResult<T>,
    {
        let mut conn = self.get_conn()?;
        f(&mut conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDLESS: &str = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n)
                           SELECT COUNT(*) FROM n";

    #[test]
    fn test_deadline_interrupts_running_statement() {
        let db = Database::in_memory().unwrap();
        let deadline = Instant::now() + Duration::from_millis(50);
        let outcome = db
            .with_conn(|conn| {
                with_deadline(conn, deadline, |conn| {
                    Ok(conn.query_row(ENDLESS, [], |row| row.get::<_, i64>(0))?)
                })
            })
            .unwrap();
        assert!(outcome.is_none());
        assert!(Instant::now() < deadline + Duration::from_secs(5));

        // The handler is gone once the call returns
        let bounded = "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 20000)
                       SELECT COUNT(*) FROM n";
        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row(bounded, [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 20000);
    }

    #[test]
    fn test_deadline_leaves_quick_statement_alone() {
        let db = Database::in_memory().unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);
        let value = db
            .with_conn(|conn| {
                with_deadline(conn, deadline, |conn| {
                    Ok(conn.query_row("SELECT 7", [], |row| row.get::<_, i64>(0))?)
                })
            })
            .unwrap();
        assert_eq!(value, Some(7));
    }
}
