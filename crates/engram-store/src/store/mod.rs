//! SQLite-backed memory store.
//!
//! Single database file holding the three entities: agents, projects, and
//! memories. Every public operation is a self-contained transaction against
//! the connection; there is no cross-call atomicity to coordinate.

mod agent_ops;
mod memory_ops;
mod search;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::limits::MemoryLimits;

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = r#"
-- Agents: identities with private memory spaces
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    definition_path TEXT,
    signing_key TEXT,
    created_at TEXT NOT NULL
);

-- Projects: scoping contexts, unique by path independent of id
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Memories: append-only records with supersession links
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    region TEXT NOT NULL,
    project_id TEXT,
    kind TEXT NOT NULL,
    content TEXT NOT NULL,
    original_content TEXT NOT NULL,
    impact TEXT NOT NULL,
    confidence REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    previous_memory_id TEXT,
    version INTEGER NOT NULL DEFAULT 1,
    superseded_by TEXT,
    signature TEXT,
    token_count INTEGER
);

CREATE INDEX IF NOT EXISTS idx_memories_agent
    ON memories(agent_id);

CREATE INDEX IF NOT EXISTS idx_memories_agent_kind
    ON memories(agent_id, kind);

CREATE INDEX IF NOT EXISTS idx_memories_created_at
    ON memories(created_at);
"#;

/// Memory store backed by SQLite.
///
/// Uses WAL mode for better read concurrency, though the design assumes a
/// single agent process at a time.
pub struct MemoryStore {
    /// The SQLite connection (wrapped in Mutex for thread safety).
    pub(crate) conn: Mutex<Connection>,
    /// Ceilings enforced when new memories are created.
    pub(crate) limits: MemoryLimits,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Open or create a memory store at the given path with default limits.
    ///
    /// Creates the database file and parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_limits(path, MemoryLimits::default())
    }

    /// Open or create a memory store with explicit limits.
    pub fn open_with_limits(path: impl AsRef<Path>, limits: MemoryLimits) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|_| {
                    StoreError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
            limits,
        };
        store.initialize()?;

        info!("Memory store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store with no limits (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_limits(MemoryLimits::UNLIMITED)
    }

    /// Create an in-memory store with explicit limits.
    pub fn open_in_memory_with_limits(limits: MemoryLimits) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            limits,
        };
        store.initialize()?;

        debug!("In-memory store created");
        Ok(store)
    }

    /// The limits this store enforces.
    pub fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// Initialize pragmas and schema.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Execute a function within a transaction.
    ///
    /// All statements in the closure commit atomically; an error rolls back
    /// every change.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            // Transaction rolls back when dropped
            Err(e) => Err(e),
        }
    }
}

impl crate::backend::StorageBackend for MemoryStore {
    fn save_agent(&self, agent: &engram_types::Agent) -> Result<()> {
        MemoryStore::save_agent(self, agent)
    }

    fn get_agent(&self, agent_id: &str) -> Result<Option<engram_types::Agent>> {
        MemoryStore::get_agent(self, agent_id)
    }

    fn save_project(&self, project: &engram_types::Project) -> Result<()> {
        MemoryStore::save_project(self, project)
    }

    fn get_project(&self, project_id: &str) -> Result<Option<engram_types::Project>> {
        MemoryStore::get_project(self, project_id)
    }

    fn get_project_by_path(&self, path: &Path) -> Result<Option<engram_types::Project>> {
        MemoryStore::get_project_by_path(self, path)
    }

    fn save_memory(&self, memory: &engram_types::Memory) -> Result<()> {
        MemoryStore::save_memory(self, memory)
    }

    fn get_memory(&self, id: engram_types::MemoryId) -> Result<Option<engram_types::Memory>> {
        MemoryStore::get_memory(self, id)
    }

    fn get_memories_for_agent(
        &self,
        agent_id: &str,
        filter: &crate::backend::MemoryFilter,
    ) -> Result<Vec<engram_types::Memory>> {
        MemoryStore::get_memories_for_agent(self, agent_id, filter)
    }

    fn get_latest_memory_of_kind(
        &self,
        agent_id: &str,
        kind: engram_types::MemoryKind,
        region: engram_types::Region,
        project_id: Option<&str>,
    ) -> Result<Option<engram_types::Memory>> {
        MemoryStore::get_latest_memory_of_kind(self, agent_id, kind, region, project_id)
    }

    fn supersede_memory(
        &self,
        old_id: engram_types::MemoryId,
        new_id: engram_types::MemoryId,
    ) -> Result<()> {
        MemoryStore::supersede_memory(self, old_id, new_id)
    }

    fn update_confidence(&self, id: engram_types::MemoryId, confidence: f64) -> Result<()> {
        MemoryStore::update_confidence(self, id, confidence)
    }

    fn touch_memory(&self, id: engram_types::MemoryId) -> Result<()> {
        MemoryStore::touch_memory(self, id)
    }

    fn delete_memory(&self, id: engram_types::MemoryId) -> Result<bool> {
        MemoryStore::delete_memory(self, id)
    }

    fn search_memories(
        &self,
        agent_id: &str,
        query: &str,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<engram_types::Memory>> {
        MemoryStore::search_memories(self, agent_id, query, project_id, limit)
    }

    fn count_memories(&self, agent_id: &str, project_id: Option<&str>) -> Result<usize> {
        MemoryStore::count_memories(self, agent_id, project_id)
    }

    fn count_memories_by_kind(
        &self,
        agent_id: &str,
        kind: engram_types::MemoryKind,
        project_id: Option<&str>,
    ) -> Result<usize> {
        MemoryStore::count_memories_by_kind(self, agent_id, kind, project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    #[test]
    fn test_open_in_memory() {
        let store = MemoryStore::open_in_memory().unwrap();
        assert_eq!(store.limits(), MemoryLimits::UNLIMITED);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("memories.db");

        let store = MemoryStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.limits(), MemoryLimits::default());
    }

    #[test]
    fn test_reopen_preserves_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.db");

        drop(MemoryStore::open(&path).unwrap());
        // Second open must not fail re-running the schema
        let store = MemoryStore::open(&path).unwrap();
        drop(store);
    }

    #[test]
    fn test_with_transaction_commits() {
        let store = MemoryStore::open_in_memory().unwrap();

        let result = store.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO agents (id, name, created_at) VALUES (?1, ?2, ?3)",
                params!["a", "A", "2025-01-01T00:00:00Z"],
            )?;
            Ok("done")
        });
        assert_eq!(result.unwrap(), "done");

        let count: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_with_transaction_rolls_back() {
        let store = MemoryStore::open_in_memory().unwrap();

        let result: Result<()> = store.with_transaction(|conn| {
            conn.execute(
                "INSERT INTO agents (id, name, created_at) VALUES (?1, ?2, ?3)",
                params!["a", "A", "2025-01-01T00:00:00Z"],
            )?;
            Err(StoreError::InvalidData("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
