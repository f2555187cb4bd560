//! Configuration for the Engram long-term memory store.
//!
//! Settings load from `~/.engram/config.json`. Every field has a default; a
//! missing or malformed file yields pure defaults and never an error, so the
//! memory store keeps working even with a corrupt config on disk.
//!
//! There is no hidden global: construct an [`EngramConfig`] once at process
//! start and pass it by reference into the store and lifecycle engines. Call
//! [`EngramConfig::reload`] to replace the value after the file changes.

mod error;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub use error::{ConfigError, Result};

/// Config filename within the Engram home directory.
const CONFIG_FILE: &str = "config.json";

/// Home-relative directory holding the config file and the default database.
const ENGRAM_DIR: &str = ".engram";

/// Identity of the default agent, used when no explicit agent is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    /// Optional key enabling memory signing for the default agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "anima".to_string(),
            name: "Anima".to_string(),
            signing_key: None,
        }
    }
}

/// Token budget for memory injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Fraction of the context window reserved for memories.
    pub context_percent: f64,
    /// Context window size in tokens.
    pub context_size: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            context_percent: 0.10,
            context_size: 200_000,
        }
    }
}

impl BudgetConfig {
    /// The token budget: `floor(context_size * context_percent)`.
    pub fn budget_tokens(&self) -> usize {
        (self.context_size as f64 * self.context_percent) as usize
    }
}

/// Age thresholds, in days, after which memories of each impact level
/// compact. CRITICAL never decays and is not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub low_days: u32,
    pub medium_days: u32,
    pub high_days: u32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            low_days: 1,
            medium_days: 7,
            high_days: 30,
        }
    }
}

/// Top-level Engram configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    pub agent: AgentConfig,
    pub budget: BudgetConfig,
    pub decay: DecayConfig,
}

impl EngramConfig {
    /// Default config file path (`~/.engram/config.json`), if a home
    /// directory can be resolved.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(ENGRAM_DIR).join(CONFIG_FILE))
    }

    /// Default database path (`~/.engram/memories.db`).
    pub fn default_db_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(ENGRAM_DIR).join("memories.db"))
    }

    /// Load configuration from a file, merging with defaults.
    ///
    /// A missing, unreadable, or malformed file yields pure defaults.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!("Malformed config at {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load configuration from the default path.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Replace this config with a fresh load from the given file.
    pub fn reload_from(&mut self, path: &Path) {
        *self = Self::load_from(path);
    }

    /// Replace this config with a fresh load from the default path.
    pub fn reload(&mut self) {
        *self = Self::load();
    }

    /// Save configuration to a file, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
                path: path.display().to_string(),
                source,
            })?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::WriteFile {
            path: path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}
