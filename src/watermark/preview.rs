//! Interactive preview rendering and drag positioning.
//!
//! The preview works on a downsampled copy of the source so re-rendering is
//! cheap. Rendering is pull-based: the UI calls [`PreviewSource::render`]
//! whenever it needs a fresh frame (after a config change or on its own
//! timer); nothing is pushed or cached between frames except the decoded
//! overlay images held by the [`RenderContext`].
//!
//! Dragging converts pointer positions in preview space into a free-form
//! normalized placement, which resolves identically at export resolution.

use image::RgbaImage;
use std::path::Path;

use super::config::{Placement, WatermarkConfig};
use super::image_overlay::resample;
use super::position::Rect;
use super::processor::RenderContext;
use super::WatermarkError;
use crate::source::load_source;

/// Downsampled source image kept for the lifetime of a preview.
#[derive(Debug, Clone)]
pub struct PreviewSource {
    image: RgbaImage,
    source_size: (u32, u32),
    scale: f32,
}

/// A rendered preview frame.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub image: RgbaImage,
    /// Preview pixels per source pixel
    pub scale: f32,
    /// Rotated bounding box of the watermark in preview pixels
    pub watermark_bounds: Option<Rect>,
}

impl PreviewSource {
    /// Prepare a preview whose longest edge is at most `max_edge` pixels.
    ///
    /// Images that already fit are used as-is (scale 1).
    pub fn new(image: RgbaImage, max_edge: u32) -> Result<Self, WatermarkError> {
        let (width, height) = image.dimensions();
        let longest = width.max(height);
        if longest == 0 {
            return Err(WatermarkError::Render("Preview source is empty".to_string()));
        }
        if max_edge == 0 || longest <= max_edge {
            return Ok(Self {
                image,
                source_size: (width, height),
                scale: 1.0,
            });
        }

        let scale = max_edge as f32 / longest as f32;
        let preview_w = ((width as f32 * scale).round() as u32).max(1);
        let preview_h = ((height as f32 * scale).round() as u32).max(1);
        let preview = resample(&image, preview_w, preview_h).map_err(WatermarkError::Render)?;

        Ok(Self {
            image: preview,
            source_size: (width, height),
            // Use the realized ratio so geometry matches the pixels on screen
            scale: preview_w as f32 / width as f32,
        })
    }

    /// Load a source file (EXIF-oriented) and prepare its preview.
    pub fn open(path: &Path, max_edge: u32) -> Result<Self, WatermarkError> {
        let image = load_source(path)?.to_rgba8();
        Self::new(image, max_edge)
    }

    pub fn source_size(&self) -> (u32, u32) {
        self.source_size
    }

    pub fn preview_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Render the watermark onto a fresh copy of the preview image.
    pub fn render(
        &self,
        config: &WatermarkConfig,
        ctx: &RenderContext,
    ) -> Result<PreviewFrame, WatermarkError> {
        let mut image = self.image.clone();
        let placement = ctx.render_watermark(&mut image, config, self.scale)?;
        Ok(PreviewFrame {
            image,
            scale: self.scale,
            watermark_bounds: placement.map(|p| p.bounds()),
        })
    }
}

impl PreviewFrame {
    /// Whether a preview-space point falls on the watermark's bounding box.
    pub fn hit_test(&self, x: f32, y: f32) -> bool {
        self.watermark_bounds
            .map(|bounds| bounds.contains(x, y))
            .unwrap_or(false)
    }

    /// Map a preview-space point to source-image pixels.
    pub fn to_source_coords(&self, x: f32, y: f32) -> (f32, f32) {
        (x / self.scale, y / self.scale)
    }
}

/// An in-progress drag of the watermark on a preview frame.
///
/// The grab offset between pointer and watermark center is kept, so the
/// watermark does not jump to the pointer when the drag starts.
#[derive(Debug, Clone, Copy)]
pub struct DragSession {
    grab_dx: f32,
    grab_dy: f32,
    frame_width: f32,
    frame_height: f32,
}

impl DragSession {
    /// Start a drag if the pointer is on the watermark.
    pub fn begin(frame: &PreviewFrame, pointer: (f32, f32)) -> Option<Self> {
        let bounds = frame.watermark_bounds?;
        if !bounds.contains(pointer.0, pointer.1) {
            return None;
        }
        let (cx, cy) = bounds.center();
        let (width, height) = frame.image.dimensions();
        Some(Self {
            grab_dx: pointer.0 - cx,
            grab_dy: pointer.1 - cy,
            frame_width: width as f32,
            frame_height: height as f32,
        })
    }

    /// Placement for the current pointer position.
    ///
    /// The center is clamped to the image, so the watermark may hang off the
    /// edge but can never be lost entirely.
    pub fn update(&self, pointer: (f32, f32)) -> Placement {
        let x = (pointer.0 - self.grab_dx) / self.frame_width;
        let y = (pointer.1 - self.grab_dy) / self.frame_height;
        Placement::Free {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}
