//! Store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the template and session stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored file exists but could not be parsed
    #[error("Failed to load {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    /// No template with this name
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Name is empty after trimming
    #[error("Invalid template name: '{0}'")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
