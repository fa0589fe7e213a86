//! Banned-combo persistence.
//!
//! The generator only ever reads a snapshot via [`BannedComboStore::fetch_all`];
//! adding and removing bans is an administrative operation gated by the
//! caller.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// An ordered (source, target) pair that must never be suggested.
///
/// The roles are not interchangeable: `source` always names a song from the
/// source catalog and `target` one from the target catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BannedCombo {
    pub source: String,
    pub target: String,
}

impl BannedCombo {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for BannedCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.source, self.target)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Banned combo database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare banned combo database at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Banned combo store lock poisoned")]
    Poisoned,

    #[error("Banned combo store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BannedComboStore: Send + Sync {
    /// Current snapshot of every banned combo.
    async fn fetch_all(&self) -> Result<HashSet<BannedCombo>, StoreError>;

    /// Insert a combo. Returns false if it was already present.
    async fn add(&self, combo: &BannedCombo) -> Result<bool, StoreError>;

    /// Delete a combo. Returns false if it was not present.
    async fn remove(&self, combo: &BannedCombo) -> Result<bool, StoreError>;
}

/// Process-local store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBannedStore {
    combos: RwLock<HashSet<BannedCombo>>,
}

impl MemoryBannedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_combos(combos: impl IntoIterator<Item = BannedCombo>) -> Self {
        Self {
            combos: RwLock::new(combos.into_iter().collect()),
        }
    }
}

#[async_trait]
impl BannedComboStore for MemoryBannedStore {
    async fn fetch_all(&self) -> Result<HashSet<BannedCombo>, StoreError> {
        Ok(self.combos.read().await.clone())
    }

    async fn add(&self, combo: &BannedCombo) -> Result<bool, StoreError> {
        Ok(self.combos.write().await.insert(combo.clone()))
    }

    async fn remove(&self, combo: &BannedCombo) -> Result<bool, StoreError> {
        Ok(self.combos.write().await.remove(combo))
    }
}

/// SQLite-backed store.
///
/// Statements are tiny, so they run inline on the calling task under a mutex.
pub struct SqliteBannedStore {
    connection: Mutex<Connection>,
}

impl SqliteBannedStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let connection = Connection::open(db_path)?;
        connection.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS banned_combos (
                source     TEXT NOT NULL,
                target     TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (source, target)
            );",
        )?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let conn = self.connection.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&conn)?)
    }
}

#[async_trait]
impl BannedComboStore for SqliteBannedStore {
    async fn fetch_all(&self) -> Result<HashSet<BannedCombo>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT source, target FROM banned_combos")?;
            let rows = stmt.query_map([], |row| {
                Ok(BannedCombo {
                    source: row.get(0)?,
                    target: row.get(1)?,
                })
            })?;
            let combos = rows.collect::<Result<HashSet<_>, _>>()?;
            Ok(combos)
        })
    }

    async fn add(&self, combo: &BannedCombo) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO banned_combos (source, target, created_at)
                 VALUES (?1, ?2, ?3)",
                params![combo.source, combo.target, now],
            )?;
            Ok(inserted > 0)
        })
    }

    async fn remove(&self, combo: &BannedCombo) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM banned_combos WHERE source = ?1 AND target = ?2",
                params![combo.source, combo.target],
            )?;
            Ok(deleted > 0)
        })
    }
}
