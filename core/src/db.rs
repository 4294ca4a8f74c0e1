use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};

use crate::store::KvBackend;

/// SQLite-backed string key-value table. This is the durable substrate every
/// other component reads and writes through [`crate::store::Store`].
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }
}

impl KvBackend for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        // substr() instead of LIKE: '_' in key names is a LIKE wildcard.
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Changes whenever another connection commits to the same file.
    fn data_version(&self) -> Result<Option<i64>> {
        let version = self
            .conn
            .pragma_query_value(None, "data_version", |row| row.get(0))?;
        Ok(Some(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_overwrite() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get("profiles").unwrap().is_none());

        db.set("profiles", "[]").unwrap();
        assert_eq!(db.get("profiles").unwrap().as_deref(), Some("[]"));

        db.set("profiles", "[1]").unwrap();
        assert_eq!(db.get("profiles").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_remove() {
        let db = Database::open_in_memory().unwrap();
        db.set("activeProfileId", "\"p1\"").unwrap();
        assert!(db.remove("activeProfileId").unwrap());
        assert!(!db.remove("activeProfileId").unwrap());
        assert!(db.get("activeProfileId").unwrap().is_none());
    }

    #[test]
    fn test_keys_with_prefix_is_literal() {
        let db = Database::open_in_memory().unwrap();
        db.set("intake_p1_2024-06-15", "[]").unwrap();
        db.set("intake_p1_2024-06-14", "[]").unwrap();
        db.set("intake_p10_2024-06-15", "[]").unwrap();
        // Would match "intake_p1_" under LIKE since '_' is a wildcard there.
        db.set("intakeXp1X2024", "[]").unwrap();

        let keys = db.keys_with_prefix("intake_p1_").unwrap();
        assert_eq!(keys, vec!["intake_p1_2024-06-14", "intake_p1_2024-06-15"]);
    }

    #[test]
    fn test_file_backed_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nibble.db");
        {
            let db = Database::open(&path).unwrap();
            db.set("foodsCache", "[]").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get("foodsCache").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_data_version_sees_other_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nibble.db");
        let a = Database::open(&path).unwrap();
        let b = Database::open(&path).unwrap();

        let before = a.data_version().unwrap();
        b.set("profiles", "[]").unwrap();
        let after = a.data_version().unwrap();
        assert_ne!(before, after);
    }
}
