//! Error types for the roster registry.
//!
//! Core registry operations communicate failure through absent results and
//! boolean success flags; structured errors exist for the fallible surfaces
//! around them, chiefly manifest loading.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the roster registry.
#[derive(Debug, Error)]
pub enum RosterError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Manifest validation errors
    #[error("Manifest error: {message}")]
    Manifest { message: String },
}

/// Result type alias for roster operations.
pub type Result<T> = std::result::Result<T, RosterError>;

// Conversion implementations for common error types

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        RosterError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        RosterError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}
