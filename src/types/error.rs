//! Error types for mirrorsync

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a mirror run from starting.
///
/// Failures that happen *during* a run (one file, one directory) are never
/// returned as `MirrorError`; they are recorded as [`crate::Failure`] entries
/// on the progress tracker instead.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The configuration file could not be parsed
    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// No configuration file could be located
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// A scanner or worker thread could not be spawned
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl MirrorError {
    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, MirrorError::Validation(_) | MirrorError::Config(_))
    }

    /// Check if this error comes from reading or writing the config file
    pub fn is_config_file_error(&self) -> bool {
        matches!(
            self,
            MirrorError::ConfigParse(_)
                | MirrorError::ConfigWrite(_)
                | MirrorError::ConfigNotFound { .. }
        )
    }
}
