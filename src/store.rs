#[cfg(test)]
use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const USERS_KEY: &str = "attendance.users";
pub const STUDENTS_KEY: &str = "attendance.students";
pub const SESSIONS_KEY: &str = "attendance.sessions";
pub const AUTH_SESSION_KEY: &str = "attendance.session";

/// Raw key-value persistence behind the store. Backends are interchangeable;
/// the daemon uses sqlite in the workspace folder, tests use memory.
pub trait Backend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

#[cfg(test)]
impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace)?;
        let db_path = workspace.join("attendance.sqlite3");
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_entries(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl Backend for SqliteBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_entries WHERE key = ?", [key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO kv_entries(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?", [key])?;
        Ok(())
    }
}

/// JSON mirror over a backend. Every write re-serializes the whole
/// collection; a failed write is logged and dropped, leaving the in-memory
/// copy authoritative until the next successful write.
pub struct Store {
    backend: Box<dyn Backend>,
}

impl Store {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn open_workspace(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Box::new(SqliteBackend::open(workspace)?)))
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Missing keys and undecodable values both come back as None; callers
    /// fall back to their seed data, the way the original hydrated.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(v) => v?,
            Err(e) => {
                log::warn!("storage read failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("stored value under {} is not decodable: {}", key, e);
                None
            }
        }
    }

    pub fn write_json<T: Serialize>(&mut self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("serialize failed for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.backend.set(key, &raw) {
            log::warn!("storage write failed for {}: {}", key, e);
        }
    }

    pub fn clear(&mut self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            log::warn!("storage remove failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut store = Store::in_memory();
        store.write_json(USERS_KEY, &vec!["a".to_string(), "b".to_string()]);
        let back: Option<Vec<String>> = store.read_json(USERS_KEY);
        assert_eq!(back, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn missing_and_cleared_keys_read_as_none() {
        let mut store = Store::in_memory();
        assert_eq!(store.read_json::<Vec<String>>(SESSIONS_KEY), None);
        store.write_json(SESSIONS_KEY, &vec![1, 2, 3]);
        store.clear(SESSIONS_KEY);
        assert_eq!(store.read_json::<Vec<i64>>(SESSIONS_KEY), None);
    }

    #[test]
    fn undecodable_value_reads_as_none() {
        let mut store = Store::in_memory();
        store.write_json(STUDENTS_KEY, &"not an array");
        assert_eq!(store.read_json::<Vec<i64>>(STUDENTS_KEY), None);
    }
}
