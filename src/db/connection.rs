use rusqlite::Connection;
use std::cell::RefCell;

use crate::errors::DbError;

const SCHEMA: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, tagged with the path it was opened for.
thread_local! {
    static DB_CONN: RefCell<Option<(String, Connection)>> = RefCell::new(None);
}

#[derive(Debug, Clone)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Provides a mutable connection to the closure. A thread that last
    /// talked to another database file reopens.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DbError>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                let stale = !matches!(slot.as_ref(), Some((path, _)) if *path == self.path);
                if stale {
                    let conn = Connection::open(&self.path).map_err(|e| DbError::Open(e.to_string()))?;
                    *slot = Some((self.path.clone(), conn));
                }
                match slot.as_mut() {
                    Some((_, conn)) => f(conn),
                    None => Err(DbError::Unavailable),
                }
            })
            .map_err(|_| DbError::Unavailable)?
    }

    /// Applies the embedded schema. Idempotent.
    pub fn init(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })?;
        tracing::info!(path = %self.path, "database initialized");
        Ok(())
    }
}
