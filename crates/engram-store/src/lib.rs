//! SQLite storage engine for the Engram long-term memory store.
//!
//! Provides durable, queryable persistence for agents, projects, and
//! memories, with enforced memory-count ceilings and the supersession and
//! visibility queries the lifecycle engines build on.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  MemoryStore (SQLite, WAL mode)                            │
//! │  - agents / projects / memories tables                     │
//! │  - per-agent / per-project / per-kind creation ceilings    │
//! │  - append-only supersession (superseded_by links)          │
//! │  - literal substring search with LIKE escaping             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use engram_store::{MemoryStore, MemoryFilter};
//! use engram_types::{Memory, MemoryKind, ImpactLevel};
//!
//! let store = MemoryStore::open("~/.engram/memories.db")?;
//!
//! let memory = Memory::new(
//!     "anima",
//!     MemoryKind::Learnings,
//!     ImpactLevel::Medium,
//!     "Integration tests need a fresh database per case",
//! );
//! store.save_memory(&memory)?;
//!
//! let active = store.get_memories_for_agent("anima", &MemoryFilter::default())?;
//! # Ok::<(), engram_store::StoreError>(())
//! ```
//!
//! Visibility rule: queries scoped to a project return that project's
//! memories *plus* all AGENT-region memories. Agent-wide memories appear in
//! every project view.

pub mod backend;
pub mod error;
pub mod limits;
pub mod store;

pub use backend::{MemoryFilter, StorageBackend};
pub use error::{Result, StoreError};
pub use limits::{LimitScope, MemoryLimits};
pub use store::MemoryStore;
