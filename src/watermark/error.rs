//! Watermark error types.
//!
//! Defines errors that can occur while building or rendering a watermark.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during watermark rendering.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Overlay image (or any other image asset) could not be read or decoded
    #[error("Failed to load asset {}: {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    /// Failed to rasterize or resample the watermark layer
    #[error("Failed to render watermark: {0}")]
    Render(String),

    /// Invalid configuration
    #[error("Watermark configuration error: {0}")]
    InvalidConfig(String),

    /// Font could not be parsed or resolved
    #[error("Font error: {0}")]
    Font(String),
}

impl WatermarkError {
    pub fn asset_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
