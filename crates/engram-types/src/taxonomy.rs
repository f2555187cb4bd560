//! The closed taxonomy: regions, kinds, and impact levels.
//!
//! These enums are the validated boundary between free-form external input
//! (CLI flags, JSON, database columns) and the core. Use [`std::str::FromStr`]
//! to parse; invalid input is rejected with a [`TypesError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Where a memory applies: agent-wide or scoped to a single project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    /// Cross-project memories for this agent.
    Agent,
    /// Project-specific memories.
    Project,
}

impl Region {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Agent => "AGENT",
            Region::Project => "PROJECT",
        }
    }
}

impl FromStr for Region {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AGENT" => Ok(Region::Agent),
            "PROJECT" => Ok(Region::Project),
            other => Err(TypesError::UnknownRegion(other.to_string())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a memory is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryKind {
    /// Relationship patterns, communication style.
    Emotional,
    /// Technical foundations, patterns, rules.
    Architectural,
    /// Lessons learned, errors to avoid.
    Learnings,
    /// Completed work, milestones.
    Achievements,
}

impl MemoryKind {
    /// All kinds, in injection priority order.
    pub const ALL: [MemoryKind; 4] = [
        MemoryKind::Emotional,
        MemoryKind::Architectural,
        MemoryKind::Learnings,
        MemoryKind::Achievements,
    ];

    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Emotional => "EMOTIONAL",
            MemoryKind::Architectural => "ARCHITECTURAL",
            MemoryKind::Learnings => "LEARNINGS",
            MemoryKind::Achievements => "ACHIEVEMENTS",
        }
    }

    /// Short code used in the injected wire format.
    pub fn short(&self) -> &'static str {
        match self {
            MemoryKind::Emotional => "EMOT",
            MemoryKind::Architectural => "ARCH",
            MemoryKind::Learnings => "LEARN",
            MemoryKind::Achievements => "ACHV",
        }
    }

    /// Injection priority within an impact tier.
    ///
    /// Emotional memories sort first because they shape interaction style.
    pub fn priority(&self) -> u8 {
        match self {
            MemoryKind::Emotional => 0,
            MemoryKind::Architectural => 1,
            MemoryKind::Learnings => 2,
            MemoryKind::Achievements => 3,
        }
    }
}

impl FromStr for MemoryKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMOTIONAL" => Ok(MemoryKind::Emotional),
            "ARCHITECTURAL" => Ok(MemoryKind::Architectural),
            "LEARNINGS" => Ok(MemoryKind::Learnings),
            "ACHIEVEMENTS" => Ok(MemoryKind::Achievements),
            other => Err(TypesError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Importance tier. Controls decay rate and injection priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    /// Aggressive decay after a day.
    Low,
    /// Moderate decay after a week.
    Medium,
    /// Gentle decay after a month.
    High,
    /// Never decays, keeps full detail forever.
    Critical,
}

impl ImpactLevel {
    /// All levels, highest priority first.
    pub const ALL: [ImpactLevel; 4] = [
        ImpactLevel::Critical,
        ImpactLevel::High,
        ImpactLevel::Medium,
        ImpactLevel::Low,
    ];

    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "LOW",
            ImpactLevel::Medium => "MEDIUM",
            ImpactLevel::High => "HIGH",
            ImpactLevel::Critical => "CRITICAL",
        }
    }

    /// Short code used in the injected wire format.
    pub fn short(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "LOW",
            ImpactLevel::Medium => "MED",
            ImpactLevel::High => "HIGH",
            ImpactLevel::Critical => "CRIT",
        }
    }

    /// Injection priority. CRITICAL sorts first.
    pub fn priority(&self) -> u8 {
        match self {
            ImpactLevel::Critical => 0,
            ImpactLevel::High => 1,
            ImpactLevel::Medium => 2,
            ImpactLevel::Low => 3,
        }
    }
}

impl FromStr for ImpactLevel {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(ImpactLevel::Low),
            "MEDIUM" => Ok(ImpactLevel::Medium),
            "HIGH" => Ok(ImpactLevel::High),
            "CRITICAL" => Ok(ImpactLevel::Critical),
            other => Err(TypesError::UnknownImpact(other.to_string())),
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
