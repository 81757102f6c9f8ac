use super::StateStore;
use crate::error::StoreError;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed store. One row per key in `state_entries`.
pub struct SqliteStateStore {
    conn: Mutex<Connection>,
}

impl SqliteStateStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS state_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn read(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.prepare_cached("SELECT value FROM state_entries WHERE key = ?1")?
        .query_row([key], |row| row.get(0))
        .optional()
}

fn write(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO state_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn delete(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM state_entries WHERE key = ?1", [key])?;
    Ok(())
}

impl StateStore for SqliteStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(read(&self.conn(), key)?)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(write(&self.conn(), key, value)?)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Ok(delete(&self.conn(), key)?)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn();
        // IMMEDIATE takes the write lock up front so a second process cannot
        // read the same value between our read and write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = read(&tx, key)?;
        match apply(current.as_deref()) {
            Some(next) => write(&tx, key, &next)?,
            None => delete(&tx, key)?,
        }
        tx.commit()?;
        Ok(())
    }
}
