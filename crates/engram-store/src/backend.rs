//! Storage backend trait for pluggable persistence.
//!
//! The lifecycle engines (decay, injection) operate against this trait
//! rather than the concrete SQLite store, so an alternative backend or a
//! test double can be swapped in without touching the algorithms.

use std::path::Path;

use engram_types::{Agent, Memory, MemoryId, MemoryKind, Project, Region};

use crate::error::Result;

/// Filters for [`StorageBackend::get_memories_for_agent`].
///
/// The default filter returns every active (non-superseded) memory for the
/// agent, newest first.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Restrict to one region.
    pub region: Option<Region>,
    /// Restrict to one project. PROJECT-scoped rows for that project are
    /// returned *plus* all AGENT-region rows: agent-wide memories stay
    /// visible in every project view.
    pub project_id: Option<String>,
    /// Restrict to one kind.
    pub kind: Option<MemoryKind>,
    /// Also return superseded memories.
    pub include_superseded: bool,
    /// Cap the number of results.
    pub limit: Option<usize>,
}

impl MemoryFilter {
    /// Restrict to a region.
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Restrict to a project (AGENT-region rows remain visible).
    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Restrict to a kind.
    pub fn kind(mut self, kind: MemoryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Include superseded memories in the results.
    pub fn include_superseded(mut self) -> Self {
        self.include_superseded = true;
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Trait for memory storage backends.
///
/// Each operation is a self-contained transaction: it either completes or
/// propagates an error, and no operation spans multiple externally-visible
/// transactions. Implementations must be `Send + Sync`.
pub trait StorageBackend: Send + Sync {
    // --- Agent operations ---

    /// Save or update an agent (idempotent upsert by id).
    fn save_agent(&self, agent: &Agent) -> Result<()>;

    /// Get an agent by id. Returns `Ok(None)` when absent.
    fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>>;

    // --- Project operations ---

    /// Save or update a project.
    ///
    /// Projects are additionally unique by path: saving a project whose path
    /// already belongs to a different id reconciles to the existing id,
    /// updating only the name. This never fails on a path conflict.
    fn save_project(&self, project: &Project) -> Result<()>;

    /// Get a project by id.
    fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    /// Get a project by its filesystem path.
    fn get_project_by_path(&self, path: &Path) -> Result<Option<Project>>;

    // --- Memory operations ---

    /// Save or update a memory (upsert by id).
    ///
    /// New memories are checked against the configured
    /// [`MemoryLimits`](crate::MemoryLimits); a violated ceiling yields
    /// [`StoreError::LimitExceeded`](crate::StoreError::LimitExceeded) and
    /// the write does not happen. Updates never count against limits.
    fn save_memory(&self, memory: &Memory) -> Result<()>;

    /// Get a memory by id.
    fn get_memory(&self, id: MemoryId) -> Result<Option<Memory>>;

    /// Get memories for an agent, filtered, ordered newest-created-first.
    fn get_memories_for_agent(&self, agent_id: &str, filter: &MemoryFilter)
    -> Result<Vec<Memory>>;

    /// Most recent active memory of a kind, used to thread the
    /// `previous_memory_id` chain at creation time.
    fn get_latest_memory_of_kind(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        region: Region,
        project_id: Option<&str>,
    ) -> Result<Option<Memory>>;

    /// Mark `old_id` as superseded by `new_id`. Does not touch the new
    /// memory.
    fn supersede_memory(&self, old_id: MemoryId, new_id: MemoryId) -> Result<()>;

    /// Directly set a memory's confidence score.
    fn update_confidence(&self, id: MemoryId, confidence: f64) -> Result<()>;

    /// Update `last_accessed` to now (called when a memory is injected).
    fn touch_memory(&self, id: MemoryId) -> Result<()>;

    /// Hard delete. Use sparingly; superseding is the normal correction.
    fn delete_memory(&self, id: MemoryId) -> Result<bool>;

    /// Case-insensitive substring search over `content` and
    /// `original_content`. Literal `%` and `_` in the query match
    /// themselves, not as wildcards.
    fn search_memories(
        &self,
        agent_id: &str,
        query: &str,
        project_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Memory>>;

    /// Count active memories for an agent (optionally scoped to a project,
    /// where AGENT-region rows still count).
    fn count_memories(&self, agent_id: &str, project_id: Option<&str>) -> Result<usize>;

    /// Count active memories of one kind for an agent.
    fn count_memories_by_kind(
        &self,
        agent_id: &str,
        kind: MemoryKind,
        project_id: Option<&str>,
    ) -> Result<usize>;
}
