//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when writing configuration.
///
/// Loading never fails: missing or malformed files fall back to defaults.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to write the config file or create its parent directory.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize the config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}
