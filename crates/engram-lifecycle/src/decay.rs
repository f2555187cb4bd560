//! Age-based, impact-scaled compaction of memory content.
//!
//! Memories compact to a shorter form once their age passes the threshold
//! for their impact level. CRITICAL memories never decay. Compaction is a
//! crude, deterministic heuristic — not summarization — so the same input
//! always compacts to the same output, and `original_content` is preserved
//! verbatim (signing depends on that).

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use engram_config::DecayConfig;
use engram_store::{MemoryFilter, Result, StorageBackend};
use engram_types::{ImpactLevel, Memory};

/// Content at or below this length (characters) is never compacted, and a
/// superseded memory below it is eligible for hard deletion.
pub const MIN_CONTENT_LENGTH: usize = 20;

/// Compacted content longer than this falls back to sentence elision or
/// truncation.
const MAX_COMPACT_LENGTH: usize = 200;

/// Hedge/filler phrases stripped during compaction. Case-sensitive, all
/// occurrences removed.
const FILLER_PHRASES: [&str; 8] = [
    "I think ",
    "I believe ",
    "We discussed ",
    "It turns out ",
    "After investigation ",
    "Spent time ",
    "Was frustrating ",
    "Learned that ",
];

/// A compaction recorded (or proposed, under dry-run) by
/// [`DecayEngine::process_decay`].
#[derive(Debug, Clone)]
pub struct CompactionChange {
    /// The memory as it was before compaction.
    pub memory: Memory,
    /// The content it compacts to.
    pub new_content: String,
}

/// Handles memory decay and compaction against a storage backend.
pub struct DecayEngine<'a> {
    store: &'a dyn StorageBackend,
    thresholds: DecayConfig,
}

impl<'a> DecayEngine<'a> {
    /// Create a decay engine using the given thresholds.
    pub fn new(store: &'a dyn StorageBackend, thresholds: &DecayConfig) -> Self {
        Self {
            store,
            thresholds: thresholds.clone(),
        }
    }

    /// Whether a memory is old enough to compact.
    ///
    /// CRITICAL memories never compact. The comparison is strictly greater:
    /// a memory exactly at its threshold does not yet compact.
    pub fn should_compact(&self, memory: &Memory, now: DateTime<Utc>) -> bool {
        let days = match memory.impact {
            ImpactLevel::Critical => return false,
            ImpactLevel::Low => self.thresholds.low_days,
            ImpactLevel::Medium => self.thresholds.medium_days,
            ImpactLevel::High => self.thresholds.high_days,
        };

        now - memory.created_at > Duration::days(i64::from(days))
    }

    /// Compact every eligible active memory for an agent.
    ///
    /// Returns the list of changes whether or not `dry_run` is set; with
    /// `dry_run` nothing is persisted. Memories whose compaction would not
    /// change the content are skipped.
    pub fn process_decay(
        &self,
        agent_id: &str,
        project_id: Option<&str>,
        dry_run: bool,
    ) -> Result<Vec<CompactionChange>> {
        let now = Utc::now();

        let mut filter = MemoryFilter::default();
        if let Some(project_id) = project_id {
            filter = filter.project(project_id);
        }
        let memories = self.store.get_memories_for_agent(agent_id, &filter)?;

        let mut changes = Vec::new();
        for memory in memories {
            if !self.should_compact(&memory, now) {
                continue;
            }

            let new_content = compact_content(&memory);
            if new_content == memory.content {
                continue;
            }

            if !dry_run {
                let mut compacted = memory.clone();
                compacted.content = new_content.clone();
                compacted.version += 1;
                self.store.save_memory(&compacted)?;
                debug!("Compacted memory {} to {} chars", memory.id, new_content.len());
            }

            changes.push(CompactionChange {
                memory,
                new_content,
            });
        }

        Ok(changes)
    }

    /// Hard-delete memories that are both superseded and compacted to
    /// near-nothing. Active short memories are never auto-deleted — a terse
    /// memory may be intentional.
    pub fn delete_empty_memories(&self, agent_id: &str) -> Result<usize> {
        let memories = self
            .store
            .get_memories_for_agent(agent_id, &MemoryFilter::default().include_superseded())?;

        let mut deleted = 0;
        for memory in memories {
            if memory.is_superseded()
                && memory.content.trim().chars().count() < MIN_CONTENT_LENGTH
                && self.store.delete_memory(memory.id)?
            {
                deleted += 1;
            }
        }

        Ok(deleted)
    }
}

/// Compact a memory's content to its essence.
///
/// Deterministic rule-based surgery, in order:
/// 1. Content at or below [`MIN_CONTENT_LENGTH`] characters returns
///    unchanged.
/// 2. Filler phrases are stripped.
/// 3. If still over 200 characters: keep the first and last sentence joined
///    by an elision marker, or hard-truncate single-sentence content.
/// 4. Trim surrounding whitespace.
pub fn compact_content(memory: &Memory) -> String {
    let mut content = memory.content.clone();

    if content.chars().count() <= MIN_CONTENT_LENGTH {
        return content;
    }

    for filler in FILLER_PHRASES {
        content = content.replace(filler, "");
    }

    if content.chars().count() > MAX_COMPACT_LENGTH {
        let sentences: Vec<&str> = content.split(". ").collect();
        if sentences.len() > 1 {
            let first = sentences[0];
            let last = sentences[sentences.len() - 1];
            content = format!("{first}. [...] {last}");
        } else {
            content = content.chars().take(MAX_COMPACT_LENGTH).collect();
            content.push_str("...");
        }
    }

    content.trim().to_string()
}
