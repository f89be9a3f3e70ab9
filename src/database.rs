use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

use crate::storage::{KeyValueStore, StorageError};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

/// SQLite-backed key-value store. Every store key maps to one row holding
/// the full serialized collection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Read the raw value stored under `key`
    pub fn get_value(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value stored under `key`
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }

    /// List stored keys with their last write time
    pub fn list_keys(&self) -> Result<Vec<(String, String)>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, updated_at FROM kv_store ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_value(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.set_value(key, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JOURNAL_KEY, TASKS_KEY};

    #[test]
    fn set_overwrites_previous_value() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_value(TASKS_KEY).unwrap(), None);

        db.set_value(TASKS_KEY, "[]").unwrap();
        db.set_value(TASKS_KEY, "[{\"id\":\"1\"}]").unwrap();

        assert_eq!(
            db.get_value(TASKS_KEY).unwrap().as_deref(),
            Some("[{\"id\":\"1\"}]")
        );
        assert_eq!(db.list_keys().unwrap().len(), 1);
    }

    #[test]
    fn keys_are_independent() {
        let db = Database::in_memory().unwrap();
        KeyValueStore::set(&db, TASKS_KEY, "tasks").unwrap();
        KeyValueStore::set(&db, JOURNAL_KEY, "journal").unwrap();

        assert_eq!(KeyValueStore::get(&db, TASKS_KEY).unwrap().as_deref(), Some("tasks"));
        assert_eq!(KeyValueStore::get(&db, JOURNAL_KEY).unwrap().as_deref(), Some("journal"));

        let keys: Vec<String> = db.list_keys().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![JOURNAL_KEY.to_string(), TASKS_KEY.to_string()]);
    }

    #[test]
    fn creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.db");

        let db = Database::new(path.to_str().unwrap()).unwrap();
        db.set_value(TASKS_KEY, "[]").unwrap();
        drop(db);

        let reopened = Database::new(path.to_str().unwrap()).unwrap();
        assert_eq!(reopened.get_value(TASKS_KEY).unwrap().as_deref(), Some("[]"));
    }
}
