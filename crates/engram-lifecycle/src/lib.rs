//! Memory lifecycle engines: decay, injection, signing, and token
//! accounting.
//!
//! Everything here operates against the
//! [`StorageBackend`](engram_store::StorageBackend) trait, so the engines
//! are independent of the concrete SQLite store.
//!
//! - [`DecayEngine`] compacts aging memory content by impact level and
//!   garbage-collects empty superseded husks.
//! - [`Injector`] selects, prioritizes, and budget-packs active memories
//!   into the wire block injected at session start.
//! - [`signing`] provides HMAC-SHA256 tamper evidence over the immutable
//!   fields of a memory.
//! - [`tokens`] supplies the [`TokenCounter`] seam and the fast character
//!   estimate used when no exact tokenizer is wired in.

pub mod decay;
pub mod injection;
pub mod signing;
pub mod tokens;

pub use decay::{CompactionChange, DecayEngine, MIN_CONTENT_LENGTH, compact_content};
pub use injection::{ImpactCounts, InjectionStats, Injector};
pub use signing::{should_sign, should_verify, sign_memory, verify_signature};
pub use tokens::{CharEstimator, TokenCounter, ensure_token_count, estimate_tokens};
