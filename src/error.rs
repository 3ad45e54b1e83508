//! Error handling module for winpersona
//!
//! Provides centralized error handling with proper error types using thiserror.
//! The resolver never produces these: its problems are data in `ResolutionResult`.

use thiserror::Error;

/// Main error type for winpersona
#[derive(Error, Debug)]
pub enum WinPersonaError {
    /// IO errors (file operations, process spawning, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persona store errors (unknown persona, duplicate name)
    #[error("Persona error: {0}")]
    Persona(String),

    /// Catalog errors (unknown entry, entry still depended upon)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Validation errors (user input, names)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Package manager invocation errors (winget missing, unparsable output)
    #[error("Package manager error: {0}")]
    PackageManager(String),

    /// Backup/restore errors
    #[error("Backup error: {0}")]
    Backup(String),

    /// History file errors
    #[error("History error: {0}")]
    History(String),

    /// Interactive prompt errors
    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// Result type alias for winpersona operations
pub type Result<T> = std::result::Result<T, WinPersonaError>;

// Convenient error constructors
impl WinPersonaError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a persona error
    pub fn persona(msg: impl Into<String>) -> Self {
        Self::Persona(msg.into())
    }

    /// Create a catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a package manager error
    pub fn package_manager(msg: impl Into<String>) -> Self {
        Self::PackageManager(msg.into())
    }

    /// Create a backup error
    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }

    /// Create a history error
    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }
}

impl From<dialoguer::Error> for WinPersonaError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Prompt(err.to_string())
    }
}
