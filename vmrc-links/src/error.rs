//! Error types for the vmrc-links CLI.

use thiserror::Error;

/// Main error type for the CLI.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// vSphere API error
    #[error("vSphere API error: {0}")]
    Api(#[from] vsphere_api::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the CLI.
pub type Result<T, E = Error> = std::result::Result<T, E>;
