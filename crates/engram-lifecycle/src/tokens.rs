//! Token accounting for the injection budget.
//!
//! Exact tokenization is an external concern: callers populate
//! [`Memory::token_count`] at save time through the [`TokenCounter`] seam so
//! that injection-time packing never pays tokenizer cost. The shipped
//! [`CharEstimator`] is the fast fallback (~4 characters per token).

use engram_types::Memory;

/// Counts tokens in a piece of text.
///
/// Implement this over an exact tokenizer and pass it to
/// [`ensure_token_count`] before saving memories.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Fast approximate counter: ~4 characters per token.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimator;

impl TokenCounter for CharEstimator {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Fast approximate token count (~4 chars per token).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Token cost of a memory's wire line.
///
/// Uses the cached `token_count` when present, falling back to the fast
/// estimate for memories saved without one.
pub fn memory_tokens(memory: &Memory) -> usize {
    match memory.token_count {
        Some(count) => count as usize,
        None => {
            let mut line = memory.to_wire();
            line.push('\n');
            estimate_tokens(&line)
        }
    }
}

/// Populate a memory's cached token count if unset.
///
/// Call before saving so injection-time budget packing is O(1) per memory.
pub fn ensure_token_count(memory: &mut Memory, counter: &dyn TokenCounter) {
    if memory.token_count.is_none() {
        let mut line = memory.to_wire();
        line.push('\n');
        memory.token_count = Some(counter.count(&line) as u32);
    }
}
