//! Durable key-value cache backed by SQLite.
//!
//! Only the knowledge base is durable; it is stored as one JSON document per
//! namespace key.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Ordered schema steps. `PRAGMA user_version` records how many have run.
const MIGRATIONS: &[(&str, &str)] = &[("kv_store", include_str!("migrations/001_initial.sql"))];

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Bring the schema up to date, one transaction per pending step.
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let applied = schema_version(&conn)?;
        if applied > MIGRATIONS.len() {
            bail!(
                "Database schema version {} is newer than this build supports ({})",
                applied,
                MIGRATIONS.len()
            );
        }

        for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied) {
            let version = index + 1;
            tracing::info!(version, name, "Applying migration");
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .with_context(|| format!("Failed to apply migration {} ({})", version, name))?;
            tx.pragma_update(None, "user_version", version as i64)?;
            tx.commit()?;
        }
        Ok(())
    }

    // ============================================================
    // Key-value operations
    // ============================================================

    /// Read the raw value stored under `key`.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the raw value stored under `key`.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(rows > 0)
    }

    /// Deserialize the JSON value stored under `key`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` as JSON under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.put_raw(key, &json)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version.max(0) as usize)
}

/// Location of the database file inside the platform data directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "tribunal")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("tribunal.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(db: &Database) -> usize {
        schema_version(&db.conn.lock().unwrap()).unwrap()
    }

    #[test]
    fn fresh_database_gets_the_kv_table() {
        let db = Database::open_memory().unwrap();
        assert_eq!(version(&db), 0);
        db.migrate().unwrap();

        let count: i32 = db
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='kv_store'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(version(&db), MIGRATIONS.len());
    }

    #[test]
    fn migrating_twice_is_a_no_op() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db.put_raw("key", "kept").unwrap();
        db.migrate().unwrap();

        assert_eq!(db.get_raw("key").unwrap().as_deref(), Some("kept"));
        assert_eq!(version(&db), MIGRATIONS.len());
    }

    #[test]
    fn refuses_a_newer_schema() {
        let db = Database::open_memory().unwrap();
        db.conn
            .lock()
            .unwrap()
            .pragma_update(None, "user_version", 99)
            .unwrap();

        let err = db.migrate().unwrap_err();
        assert!(err.to_string().contains("newer"));
    }
}
