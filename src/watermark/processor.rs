//! Watermark processor for applying the active watermark to an image.
//!
//! This module provides the high-level API used by both the preview and the
//! export pipeline. It dispatches on the watermark content into the text or
//! image renderer, resolves the placement against the target size and hands
//! the layer to the compositor.
//!
//! # Render scale
//!
//! All watermark sizes are expressed at source-image resolution. Callers pass
//! the ratio between the target they draw on and the source image: `1.0` for
//! an export, something like `0.25` for a downsampled preview.
//!
//! # Example
//!
//! ```ignore
//! use watermarker::watermark::processor::RenderContext;
//!
//! let ctx = RenderContext::new();
//! let mut image = image::open("photo.jpg")?.to_rgba8();
//! ctx.render_watermark(&mut image, &config, 1.0)?;
//! ```

use image::RgbaImage;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use super::compositor::{apply_watermark, WatermarkLayer};
use super::config::{WatermarkConfig, WatermarkContent};
use super::fonts::FontBook;
use super::image_overlay::{render_overlay, OverlayCache};
use super::position::{resolve_placement, ImageDimensions, ResolvedPlacement, WatermarkDimensions};
use super::text_renderer::render_text;
use super::WatermarkError;
use crate::constants::DEFAULT_OVERLAY_CACHE_ENTRIES;

/// Shared, read-only rendering resources: fonts and decoded overlays.
///
/// Cheap to share behind an `Arc`; both members are internally synchronized.
pub struct RenderContext {
    fonts: FontBook,
    overlays: OverlayCache,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("fonts", &self.fonts)
            .field("cached_overlays", &self.overlays.entry_count())
            .finish()
    }
}

impl RenderContext {
    /// Context with the embedded fonts and a default-sized overlay cache.
    pub fn new() -> Self {
        Self::with_parts(FontBook::new(), DEFAULT_OVERLAY_CACHE_ENTRIES)
    }

    pub fn with_parts(fonts: FontBook, overlay_cache_entries: u64) -> Self {
        Self {
            fonts,
            overlays: OverlayCache::new(overlay_cache_entries),
        }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn overlays(&self) -> &OverlayCache {
        &self.overlays
    }

    /// Forget a cached overlay so the next render reads it again.
    pub fn invalidate_overlay(&self, path: &Path) {
        self.overlays.invalidate(path);
    }

    /// Render the watermark layer for a target of the given size.
    ///
    /// The returned layer may be empty (blank text), in which case
    /// compositing it is a no-op.
    pub fn render_layer(
        &self,
        config: &WatermarkConfig,
        target: ImageDimensions,
        scale: f32,
    ) -> Result<WatermarkLayer, WatermarkError> {
        config.validate().map_err(WatermarkError::InvalidConfig)?;

        let image = match &config.content {
            WatermarkContent::Text(text) => render_text(text, config.opacity, scale, &self.fonts)?,
            WatermarkContent::Image(overlay) => {
                render_overlay(overlay, config.opacity, target.width, scale, &self.overlays)?
            }
        };

        let placement = resolve_placement(
            &config.placement,
            &target,
            &WatermarkDimensions::of(&image),
            config.rotation,
        );
        Ok(WatermarkLayer::new(image, placement))
    }

    /// Render the watermark and composite it onto `base` in place.
    ///
    /// # Returns
    ///
    /// Where the layer landed, or `None` when there was nothing to draw.
    pub fn render_watermark(
        &self,
        base: &mut RgbaImage,
        config: &WatermarkConfig,
        scale: f32,
    ) -> Result<Option<ResolvedPlacement>, WatermarkError> {
        let start = Instant::now();
        let layer = self.render_layer(config, ImageDimensions::of(base), scale)?;

        if layer.is_empty() {
            debug!(kind = config.content.kind(), "Watermark layer is empty, nothing to draw");
            return Ok(None);
        }

        apply_watermark(base, &layer);

        debug!(
            kind = config.content.kind(),
            width = base.width(),
            height = base.height(),
            scale,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Rendered watermark"
        );
        Ok(Some(layer.placement))
    }
}
