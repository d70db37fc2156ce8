//! Durable key-value backends for the library store.
//!
//! The store keeps its whole aggregate as one JSON string under one key, so a
//! backend only has to read, write and remove strings.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use fs2::FileExt;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors from a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Trait for key-value storage backends
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Read a value; `None` when the key was never written
    async fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace a value
    async fn write(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove a value (no-op when absent)
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Which backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Json,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Json => write!(f, "json"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(BackendKind::Sqlite),
            "json" => Ok(BackendKind::Json),
            "memory" => Ok(BackendKind::Memory),
            _ => anyhow::bail!("Unknown storage backend: {}", s),
        }
    }
}

/// Open a backend of the given kind.
///
/// `path` is the database file for SQLite and the directory for JSON files;
/// the memory backend ignores it.
pub fn open_backend(kind: BackendKind, path: &Path) -> Result<Arc<dyn KvBackend>, StoreError> {
    let backend: Arc<dyn KvBackend> = match kind {
        BackendKind::Sqlite => Arc::new(SqliteBackend::open(path)?),
        BackendKind::Json => Arc::new(JsonFileBackend::new(path)),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    debug!(backend = backend.name(), path = %path.display(), "Opened storage backend");
    Ok(backend)
}

// ============================================================================
// SQLite
// ============================================================================

/// Single-table SQLite backend
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&guard)
        })
        .await??;
        Ok(result)
    }
}

#[async_trait]
impl KvBackend for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                .map(|_| ())
        })
        .await
    }
}

// ============================================================================
// JSON files
// ============================================================================

/// One JSON file per key under a directory.
///
/// Writes go through a temp file and an atomic rename. An advisory lock on a
/// sibling `.lock` file covers each single read or write, so another process
/// never sees a half-written file. It does not span a caller's
/// read-modify-write; two processes updating the same key can still lose one
/// update.
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding a key
    pub fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", file_stem(key)))
    }

    fn open_lock(dir: &Path, lock_path: &Path) -> Result<fs::File, StoreError> {
        fs::create_dir_all(dir)?;
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)?)
    }
}

/// Keys are fixed identifiers, but keep them filesystem-safe regardless
fn file_stem(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl KvBackend for JsonFileBackend {
    fn name(&self) -> &str {
        "json"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let dir = self.dir.clone();
        let path = self.value_path(key);
        let lock_path = self.lock_path(key);

        tokio::task::spawn_blocking(move || -> Result<Option<String>, StoreError> {
            if !path.exists() {
                return Ok(None);
            }
            let lock = Self::open_lock(&dir, &lock_path)?;
            lock.lock_shared()?;
            let content = fs::read_to_string(&path);
            // Lock is released when `lock` is dropped
            match content {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        let path = self.value_path(key);
        let lock_path = self.lock_path(key);

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let lock = Self::open_lock(&dir, &lock_path)?;
            lock.lock_exclusive()?;

            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.flush()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await?
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        let path = self.value_path(key);
        let lock_path = self.lock_path(key);

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let lock = Self::open_lock(&dir, &lock_path)?;
            lock.lock_exclusive()?;
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }
}

// ============================================================================
// Memory
// ============================================================================

/// In-process map, lost when dropped
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn write(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}
