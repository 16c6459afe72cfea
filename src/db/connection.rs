use crate::errors::HarvestError;
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::PathBuf;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connection slot, keyed by the file it was opened on.
thread_local! {
    static DB_CONN: RefCell<Option<(PathBuf, Connection)>> = const { RefCell::new(None) };
}

#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, HarvestError>
    where
        F: FnOnce(&mut Connection) -> Result<T, HarvestError>,
    {
        DB_CONN
            .try_with(|cell| {
                let mut slot = cell.borrow_mut();
                let stale = !matches!(&*slot, Some((p, _)) if *p == self.path);
                if stale {
                    let conn = Connection::open(&self.path).map_err(|e| {
                        HarvestError::Db(format!("Open {} failed: {e}", self.path.display()))
                    })?;
                    *slot = Some((self.path.clone(), conn));
                }
                let Some((_, conn)) = slot.as_mut() else {
                    return Err(HarvestError::Db("connection slot empty".into()));
                };
                f(conn)
            })
            .map_err(|_| HarvestError::Db("thread-local connection unavailable".into()))?
    }
}

/// Apply the bundled schema. Safe to run on every start.
pub fn init_db(db: &Database) -> Result<(), HarvestError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| HarvestError::Db(format!("Failed to apply schema: {e}")))
    })?;

    log::info!("✅ Database ready at {}", db.path().display());
    Ok(())
}

#[cfg(test)]
pub(crate) fn unique_temp_db(prefix: &str) -> Database {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let db = Database::new(std::env::temp_dir().join(format!("{prefix}_{nanos}.sqlite")));
    init_db(&db).expect("Failed to initialize DB");
    db
}
