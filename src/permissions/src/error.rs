//! Error types for the permissions engine

use thiserror::Error;

/// Permissions engine errors
#[derive(Debug, Error)]
pub enum PermissionsError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A lazily built definition was initialized twice
    #[error("Permissions already initialized")]
    AlreadyInitialized,

    /// Logging could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for permissions operations
pub type Result<T> = std::result::Result<T, PermissionsError>;
