//! Export error types
//!
//! Every per-file failure of a batch is one of these. [`ExportError::kind`]
//! collapses them into the coarse categories reported to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::watermark::WatermarkError;

/// Errors that can occur while exporting a single file
#[derive(Debug, Error)]
pub enum ExportError {
    /// Source image could not be read or decoded
    #[error("Failed to load source {}: {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    /// Writing would overwrite the source or land in its folder
    #[error(
        "Refusing to write {} next to source {}: choose another output folder or allow writing into the source folder",
        output.display(),
        input.display()
    )]
    OverwriteRejected { input: PathBuf, output: PathBuf },

    /// Encoding to the output format failed
    #[error("Failed to encode to {format}: {reason}")]
    Encode { format: String, reason: String },

    /// Resize operation failed
    #[error("Resize failed: {0}")]
    Resize(String),

    /// Export settings failed validation
    #[error("Invalid export settings: {0}")]
    InvalidSettings(String),

    /// Watermark could not be rendered
    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    /// Filesystem error while writing the output
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Coarse failure category, stable for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AssetLoad,
    OverwriteRejected,
    Encode,
    Resize,
    InvalidSettings,
    Render,
    Io,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssetLoad => "asset_load",
            Self::OverwriteRejected => "overwrite_rejected",
            Self::Encode => "encode",
            Self::Resize => "resize",
            Self::InvalidSettings => "invalid_settings",
            Self::Render => "render",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ExportError {
    /// Maps export errors to failure categories
    ///
    /// An unreadable overlay counts as an asset failure just like an
    /// unreadable source; other watermark errors are render failures.
    pub fn kind(&self) -> FailureKind {
        match self {
            ExportError::AssetLoad { .. } => FailureKind::AssetLoad,
            ExportError::OverwriteRejected { .. } => FailureKind::OverwriteRejected,
            ExportError::Encode { .. } => FailureKind::Encode,
            ExportError::Resize(_) => FailureKind::Resize,
            ExportError::InvalidSettings(_) => FailureKind::InvalidSettings,
            ExportError::Watermark(WatermarkError::AssetLoad { .. }) => FailureKind::AssetLoad,
            ExportError::Watermark(_) => FailureKind::Render,
            ExportError::Io { .. } => FailureKind::Io,
        }
    }

    /// Source decode failure; keeps the path and reason of the loader error.
    pub fn source_load(error: WatermarkError) -> Self {
        match error {
            WatermarkError::AssetLoad { path, reason } => ExportError::AssetLoad { path, reason },
            other => ExportError::Watermark(other),
        }
    }

    pub fn encode_failed(format: impl Into<String>, reason: impl ToString) -> Self {
        ExportError::Encode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ExportError::Resize(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }
}
