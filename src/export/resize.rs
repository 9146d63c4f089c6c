//! Output resizing
//!
//! Resizing happens after compositing, so the watermark scales together with
//! the photo and keeps its relative size and position.

use image::RgbaImage;

use super::error::ExportError;
use super::settings::ResizeSpec;
use crate::watermark::{check_pixel_limit, resample};

/// Target size as floats, before rounding.
fn target_extent(width: u32, height: u32, spec: ResizeSpec) -> (f64, f64) {
    let aspect = height as f64 / width as f64;
    match spec {
        ResizeSpec::Width(w) => (w as f64, w as f64 * aspect),
        ResizeSpec::Height(h) => (h as f64 / aspect, h as f64),
        ResizeSpec::Percent(p) => {
            let factor = p as f64 / 100.0;
            (width as f64 * factor, height as f64 * factor)
        }
    }
}

/// Calculate target dimensions, preserving aspect ratio.
///
/// Sizes beyond `u32` saturate; `resize_image` rejects them before
/// allocating.
pub fn target_dimensions(width: u32, height: u32, spec: ResizeSpec) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let (target_w, target_h) = target_extent(width, height, spec);
    (
        (target_w.round() as u32).max(1),
        (target_h.round() as u32).max(1),
    )
}

/// Resize using fast-image-resize with Lanczos3 filter
///
/// # Errors
///
/// `ExportError::Resize` for a non-positive percentage or a target larger
/// than `MAX_RENDER_PIXELS`.
pub fn resize_image(image: &RgbaImage, spec: ResizeSpec) -> Result<RgbaImage, ExportError> {
    if let ResizeSpec::Percent(p) = spec {
        if !p.is_finite() || p <= 0.0 {
            return Err(ExportError::resize_failed(format!(
                "Resize percent must be positive, got {}",
                p
            )));
        }
    }
    if image.width() > 0 && image.height() > 0 {
        let (w, h) = target_extent(image.width(), image.height(), spec);
        check_pixel_limit(w.round(), h.round()).map_err(ExportError::resize_failed)?;
    }

    let (target_w, target_h) = target_dimensions(image.width(), image.height(), spec);
    resample(image, target_w, target_h).map_err(ExportError::resize_failed)
}
