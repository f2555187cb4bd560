//! Core data model for the Engram long-term memory store.
//!
//! Engram persists discrete memory records for an agent across sessions,
//! decays them over time based on importance, and selects a token-budget
//! constrained subset to inject into a new session's context. This crate
//! holds the shared vocabulary:
//!
//! - [`Memory`]: the atomic record — immutable identity, mutable content,
//!   append-only supersession pointer.
//! - [`Region`], [`MemoryKind`], [`ImpactLevel`]: the closed taxonomy,
//!   parsed at every external boundary.
//! - [`Agent`] / [`Project`]: identities supplied by an external resolver.
//! - [`MemoryBlock`]: the compact wire format handed to the agent runtime.

pub mod agent;
pub mod error;
pub mod memory;
pub mod taxonomy;

pub use agent::{Agent, Project, slugify};
pub use error::{Result, TypesError};
pub use memory::{LOW_CONFIDENCE_THRESHOLD, Memory, MemoryBlock, MemoryId};
pub use taxonomy::{ImpactLevel, MemoryKind, Region};
