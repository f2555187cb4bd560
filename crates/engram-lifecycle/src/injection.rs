//! Memory selection and formatting for session-start context injection.
//!
//! Retrieves the active memories for an agent (and project), ranks them by
//! priority, greedily packs them into the token budget, and renders the
//! compact wire block. Included memories are touched so `last_accessed`
//! reflects the injection.

use std::cmp::Reverse;

use tracing::debug;

use engram_config::BudgetConfig;
use engram_store::{MemoryFilter, Result, StorageBackend};
use engram_types::{Agent, ImpactLevel, Memory, MemoryBlock, Project, Region};

use crate::signing;
use crate::tokens::{estimate_tokens, memory_tokens};

/// Active-memory counts per impact level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImpactCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ImpactCounts {
    fn record(&mut self, impact: ImpactLevel) {
        match impact {
            ImpactLevel::Critical => self.critical += 1,
            ImpactLevel::High => self.high += 1,
            ImpactLevel::Medium => self.medium += 1,
            ImpactLevel::Low => self.low += 1,
        }
    }
}

/// Read-only summary of the memories available to an agent/project.
#[derive(Debug, Clone, Default)]
pub struct InjectionStats {
    /// Active AGENT-region memories.
    pub agent_memories: usize,
    /// Active PROJECT-region memories for the given project.
    pub project_memories: usize,
    pub total: usize,
    /// Configured token budget.
    pub budget_tokens: usize,
    pub impact_counts: ImpactCounts,
}

/// Selects, ranks, budget-packs, and formats memories for injection.
pub struct Injector<'a> {
    store: &'a dyn StorageBackend,
    budget: usize,
}

impl<'a> Injector<'a> {
    /// Create an injector with the configured budget.
    pub fn new(store: &'a dyn StorageBackend, budget: &BudgetConfig) -> Self {
        Self {
            store,
            budget: budget.budget_tokens(),
        }
    }

    /// The token budget this injector packs into.
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Build the injection block for an agent, optionally scoped to a
    /// project.
    ///
    /// Candidates are all active AGENT-region memories plus, with a project,
    /// the active PROJECT-region memories scoped to it. They are packed in
    /// priority order until the first one that would exceed the budget;
    /// everything after that is dropped, not reordered. Returns the empty
    /// string when nothing fits.
    pub fn inject(&self, agent: &Agent, project: Option<&Project>) -> Result<String> {
        let mut candidates = self
            .store
            .get_memories_for_agent(&agent.id, &MemoryFilter::default().region(Region::Agent))?;

        if let Some(project) = project {
            candidates.extend(self.store.get_memories_for_agent(
                &agent.id,
                &MemoryFilter::default()
                    .region(Region::Project)
                    .project(project.id.clone()),
            )?);
        }

        if candidates.is_empty() {
            return Ok(String::new());
        }

        prioritize(&mut candidates);

        let mut block = MemoryBlock::new(&agent.name, project.map(|p| p.name.clone()));

        // Header/footer overhead; small and effectively constant
        let mut current_tokens = estimate_tokens(&format!("[LTM:{}]\n[/LTM]", agent.name));

        for mut memory in candidates {
            // A failed verification flags the memory as untrusted; it is
            // still injected, with the warning marker
            if signing::should_verify(&memory, agent) {
                let key = agent.signing_key.as_deref().unwrap_or_default();
                memory.signature_valid = Some(signing::verify_signature(&memory, key));
            }

            let cost = memory_tokens(&memory);
            if current_tokens + cost > self.budget {
                // Budget exhausted: drop the rest, never skip-and-continue
                break;
            }
            current_tokens += cost;

            self.store.touch_memory(memory.id)?;
            memory.touch();
            block.memories.push(memory);
        }

        debug!(
            "Injecting {} memories (~{} of {} tokens) for agent {}",
            block.memories.len(),
            current_tokens,
            self.budget,
            agent.id
        );

        Ok(block.to_wire())
    }

    /// Summarize the memories available to an agent/project. No side
    /// effects.
    pub fn stats(&self, agent: &Agent, project: Option<&Project>) -> Result<InjectionStats> {
        let agent_memories = self
            .store
            .get_memories_for_agent(&agent.id, &MemoryFilter::default().region(Region::Agent))?;

        let project_memories = match project {
            Some(project) => self.store.get_memories_for_agent(
                &agent.id,
                &MemoryFilter::default()
                    .region(Region::Project)
                    .project(project.id.clone()),
            )?,
            None => Vec::new(),
        };

        let mut impact_counts = ImpactCounts::default();
        for memory in agent_memories.iter().chain(project_memories.iter()) {
            impact_counts.record(memory.impact);
        }

        Ok(InjectionStats {
            agent_memories: agent_memories.len(),
            project_memories: project_memories.len(),
            total: agent_memories.len() + project_memories.len(),
            budget_tokens: self.budget,
            impact_counts,
        })
    }
}

/// Total order for injection:
/// impact (CRITICAL first), then kind (EMOTIONAL first), then newest first.
fn prioritize(memories: &mut [Memory]) {
    memories.sort_by_key(|m| {
        (
            m.impact.priority(),
            m.kind.priority(),
            Reverse(m.created_at),
        )
    });
}
