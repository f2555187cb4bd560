//! Memory count ceilings.
//!
//! Limits apply only when a *new* memory is created; updates to an existing
//! id never count against them. Each ceiling is independently configurable
//! or disabled.

use std::fmt;

use engram_types::MemoryKind;

/// Configurable ceilings for memory creation.
///
/// `None` disables a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLimits {
    /// Maximum total active memories for an agent.
    pub max_per_agent: Option<usize>,
    /// Maximum active memories per (agent, project) pair.
    pub max_per_project: Option<usize>,
    /// Maximum active memories per (agent, kind) pair.
    pub max_per_kind: Option<usize>,
}

impl MemoryLimits {
    /// No ceilings at all, for tests and special cases.
    pub const UNLIMITED: MemoryLimits = MemoryLimits {
        max_per_agent: None,
        max_per_project: None,
        max_per_kind: None,
    };
}

impl Default for MemoryLimits {
    /// Generous defaults that should never be hit in normal use but stop a
    /// runaway writer from exhausting storage.
    fn default() -> Self {
        Self {
            max_per_agent: Some(10_000),
            max_per_project: Some(5_000),
            max_per_kind: Some(2_000),
        }
    }
}

/// Which ceiling a [`StoreError::LimitExceeded`] refers to.
///
/// [`StoreError::LimitExceeded`]: crate::StoreError::LimitExceeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitScope {
    /// The per-agent total.
    Agent,
    /// The per-project ceiling, carrying the project id.
    Project(String),
    /// The per-kind ceiling, carrying the kind.
    Kind(MemoryKind),
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitScope::Agent => write!(f, "agent total"),
            LimitScope::Project(id) => write!(f, "project '{id}'"),
            LimitScope::Kind(kind) => write!(f, "kind '{kind}'"),
        }
    }
}
