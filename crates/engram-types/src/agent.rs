//! Agent and project identities.
//!
//! These are supplied by an external identity resolver; the core only
//! persists and consumes them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An agent identity with its own private memory space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    /// Path to the agent's definition source, if it has one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub definition_path: Option<PathBuf>,
    /// Presence of a key toggles memory signing and verification.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub signing_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Agent {
    /// Create an agent with just an id and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            definition_path: None,
            signing_key: None,
            created_at: None,
        }
    }

    /// Attach a signing key.
    pub fn with_signing_key(mut self, key: impl Into<String>) -> Self {
        self.signing_key = Some(key.into());
        self
    }

    /// Whether this agent signs its memories.
    pub fn has_signing_key(&self) -> bool {
        self.signing_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// A project context, scoping PROJECT-region memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Derived deterministically from the name via [`slugify`].
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    /// Create a project, deriving the id from the name.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            id: slugify(&name),
            name,
            path: path.into(),
            created_at: None,
        }
    }
}

/// Convert text to a URL-safe slug for use as an ID.
///
/// Lowercases, collapses runs of non-alphanumeric characters to a single
/// hyphen, and trims leading/trailing hyphens. Empty input slugs to
/// `"default"`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        "default".to_string()
    } else {
        slug
    }
}
