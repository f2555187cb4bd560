//! The memory record and its wire-format rendering.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypesError;
use crate::taxonomy::{ImpactLevel, MemoryKind, Region};

/// Confidence below this is flagged as low (possibly contradicted).
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Unique identifier for a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(Uuid);

impl MemoryId {
    /// Generate a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID from its string form.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MemoryId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A single memory record.
///
/// Memories are append-only: corrections create new memories that supersede
/// old ones rather than rewriting history. Content decays over time based on
/// impact level; `original_content` is preserved verbatim forever and is the
/// payload that signing covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Stable identity, never reassigned.
    pub id: MemoryId,
    /// Owning agent.
    pub agent_id: String,

    /// Agent-wide or project-scoped.
    pub region: Region,
    /// Set iff `region` is [`Region::Project`].
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub project_id: Option<String>,

    /// What the memory is about.
    pub kind: MemoryKind,
    /// Current (possibly compacted) content.
    pub content: String,
    /// Original full content. Set once at creation, never mutated.
    pub original_content: String,

    /// Importance tier, immutable after creation.
    pub impact: ImpactLevel,
    /// 0.0–1.0. Lowered to signal contradiction; 0.0 means forgotten.
    pub confidence: f64,

    /// Creation instant, from the wall clock at the call site.
    pub created_at: DateTime<Utc>,
    /// Updated whenever the memory is injected.
    pub last_accessed: DateTime<Utc>,

    /// Back-link to the previous memory of the same kind.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_memory_id: Option<MemoryId>,

    /// Incremented each time decay rewrites `content`.
    pub version: u32,
    /// Forward-link to the correcting memory. `None` means active.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub superseded_by: Option<MemoryId>,

    /// Hex HMAC over the immutable fields, if the agent signs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signature: Option<String>,
    /// Transient verification result, set during injection. Never persisted.
    #[serde(skip)]
    pub signature_valid: Option<bool>,

    /// Cached token cost of the wire-format line. Populated before save so
    /// injection-time budget packing is O(1) per memory.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token_count: Option<u32>,
}

impl Memory {
    /// Create a new agent-wide memory.
    ///
    /// `original_content` is initialized from `content`; `created_at` and
    /// `last_accessed` are taken from the wall clock now.
    pub fn new(
        agent_id: impl Into<String>,
        kind: MemoryKind,
        impact: ImpactLevel,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            id: MemoryId::new(),
            agent_id: agent_id.into(),
            region: Region::Agent,
            project_id: None,
            kind,
            original_content: content.clone(),
            content,
            impact,
            confidence: 1.0,
            created_at: now,
            last_accessed: now,
            previous_memory_id: None,
            version: 1,
            superseded_by: None,
            signature: None,
            signature_valid: None,
            token_count: None,
        }
    }

    /// Scope this memory to a project.
    pub fn in_project(mut self, project_id: impl Into<String>) -> Self {
        self.region = Region::Project;
        self.project_id = Some(project_id.into());
        self
    }

    /// Link to the previous memory of the same kind.
    pub fn with_previous(mut self, previous: MemoryId) -> Self {
        self.previous_memory_id = Some(previous);
        self
    }

    /// Set the confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Whether this memory has been superseded by a correction.
    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }

    /// Whether this memory is flagged as low confidence.
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE_THRESHOLD
    }

    /// Update `last_accessed` to now.
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    /// Render the compact wire line used for context injection.
    ///
    /// Format: `~KIND:IMPACT| content`, with a `?` after the impact if
    /// confidence is low and a `⚠` prefix if signature verification was
    /// attempted and failed.
    pub fn to_wire(&self) -> String {
        let confidence_marker = if self.is_low_confidence() { "?" } else { "" };
        let untrusted_marker = if self.signature_valid == Some(false) {
            "⚠"
        } else {
            ""
        };

        format!(
            "{untrusted_marker}~{}:{}{confidence_marker}| {}",
            self.kind.short(),
            self.impact.short(),
            self.content,
        )
    }
}

/// A block of memories formatted for injection into a session's context.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlock {
    /// Display name of the owning agent.
    pub agent_name: String,
    /// Display name of the project, if scoped.
    pub project_name: Option<String>,
    /// Memories to render, already prioritized and budget-packed.
    pub memories: Vec<Memory>,
}

impl MemoryBlock {
    /// Create an empty block for an agent, optionally scoped to a project.
    pub fn new(agent_name: impl Into<String>, project_name: Option<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            project_name,
            memories: Vec::new(),
        }
    }

    /// Render the block:
    ///
    /// ```text
    /// [LTM:agent_name@project_name]
    /// ~KIND:IMPACT| content
    /// ...
    /// [/LTM]
    /// ```
    ///
    /// Superseded memories are skipped. An empty block renders as the empty
    /// string, not an empty shell.
    pub fn to_wire(&self) -> String {
        if self.memories.is_empty() {
            return String::new();
        }

        let mut header = format!("[LTM:{}", self.agent_name);
        if let Some(project) = &self.project_name {
            header.push('@');
            header.push_str(project);
        }
        header.push(']');

        let mut lines = vec![header];
        for memory in &self.memories {
            if !memory.is_superseded() {
                lines.push(memory.to_wire());
            }
        }
        lines.push("[/LTM]".to_string());

        lines.join("\n")
    }

    /// Rough token estimate for the rendered block (~4 chars per token).
    pub fn token_estimate(&self) -> usize {
        self.to_wire().chars().count() / 4
    }
}
