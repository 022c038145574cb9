//! SQLite-backed synced key-value area.
//!
//! Provides the [`SyncStore`] struct that wraps a `rusqlite::Connection`
//! and automatically creates the schema on open.

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;

use crate::types::errors::StorageError;

/// Durable key-value store holding the synced configuration keys
/// (`toggleSpeed`, `speedStep`, `speedMin`, `speedMax`, `presets`,
/// `toggleKeyCode`, `toggleShortcuts`, `lang`).
///
/// Values are stored as JSON text and returned as raw `serde_json::Value`s;
/// no shape validation happens here. Writes are last-write-wins.
pub struct SyncStore {
    conn: Connection,
}

impl SyncStore {
    /// Opens (or creates) the store at the given file path and runs migrations.
    ///
    /// # Errors
    /// Returns `StorageError` if the connection cannot be established or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    /// Opens an in-memory store, discarded on drop. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    /// Creates the schema if it does not exist. Idempotent, safe on every open.
    fn run_migrations(&self) -> Result<(), StorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS sync_kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Reads one key. Returns `None` when the key is absent or its stored
    /// text is not parseable JSON — callers normalize anyway, so unreadable
    /// values behave like missing ones.
    pub fn get(&self, key: &str) -> Option<Value> {
        let text: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM sync_kv WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten();
        text.and_then(|t| serde_json::from_str(&t).ok())
    }

    /// Writes one key, overwriting any previous value.
    pub fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_kv (key, value) VALUES (?1, ?2)",
            params![key, text],
        )?;
        Ok(())
    }

    /// Removes one key. Removing an absent key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM sync_kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// True when the store holds no keys at all. Install-time defaults are
    /// only written into an entirely empty store, never over a
    /// partially-configured one.
    pub fn is_empty(&self) -> bool {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_kv", [], |row| row.get(0))
            .unwrap_or(0);
        count == 0
    }

    /// All keys currently present, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let mut stmt = match self.conn.prepare("SELECT key FROM sync_kv") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };
        stmt.query_map([], |row| row.get(0))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }
}
