//! Image watermark loading, caching and scaling.
//!
//! Overlay images are read from disk, decoded to RGBA and kept in an
//! in-memory cache so repeated preview renders do not hit the decoder.
//! Sources without an alpha channel are treated as fully opaque.
//!
//! # Caching
//!
//! Entries remember the file's modification time, so an overlay edited on
//! disk is picked up on the next render. The cache is bounded by entry count
//! and evicts least-recently used overlays first.
//!
//! # Example
//!
//! ```ignore
//! use watermarker::watermark::image_overlay::{render_overlay, OverlayCache};
//! use watermarker::watermark::ImageWatermark;
//!
//! let cache = OverlayCache::new(16);
//! let overlay = ImageWatermark::new("logo.png");
//! let layer = render_overlay(&overlay, 0.8, 1920, 1.0, &cache)?;
//! ```

use fast_image_resize::{FilterType, Image, MulDiv, PixelType, ResizeAlg, Resizer};
use image::RgbaImage;
use moka::sync::Cache;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use super::config::{ImageWatermark, OverlaySize};
use super::position::check_pixel_limit;
use super::WatermarkError;

/// Decoded overlay shared between renders.
#[derive(Clone)]
pub struct CachedOverlay {
    pub image: Arc<RgbaImage>,
    modified: Option<SystemTime>,
}

impl std::fmt::Debug for CachedOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedOverlay")
            .field("dimensions", &self.image.dimensions())
            .finish()
    }
}

/// Bounded cache of decoded overlay images.
#[derive(Clone)]
pub struct OverlayCache {
    cache: Cache<PathBuf, CachedOverlay>,
}

impl OverlayCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }

    /// Decoded overlay for `path`, loading it on a cache miss or when the
    /// file changed since it was cached.
    ///
    /// # Errors
    ///
    /// Returns `WatermarkError::AssetLoad` if the file is missing, unreadable
    /// or not a decodable image.
    pub fn get_or_load(&self, path: &Path) -> Result<CachedOverlay, WatermarkError> {
        let metadata =
            std::fs::metadata(path).map_err(|e| WatermarkError::asset_load(path, e))?;
        let modified = metadata.modified().ok();

        if let Some(cached) = self.cache.get(path) {
            if cached.modified == modified {
                return Ok(cached);
            }
            debug!(path = %path.display(), "Overlay changed on disk, reloading");
        }

        let decoded = image::io::Reader::open(path)
            .map_err(|e| WatermarkError::asset_load(path, e))?
            .with_guessed_format()
            .map_err(|e| WatermarkError::asset_load(path, e))?
            .decode()
            .map_err(|e| WatermarkError::asset_load(path, e))?;

        debug!(
            path = %path.display(),
            width = decoded.width(),
            height = decoded.height(),
            "Decoded overlay image"
        );

        let cached = CachedOverlay {
            image: Arc::new(decoded.to_rgba8()),
            modified,
        };
        self.cache.insert(path.to_path_buf(), cached.clone());
        Ok(cached)
    }

    pub fn invalidate(&self, path: &Path) {
        self.cache.invalidate(path);
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

/// Target size of an overlay on the render canvas, aspect ratio preserved.
///
/// `canvas_width` is the width of the canvas being rendered (already at
/// target resolution); pixel and factor sizes are multiplied by `scale`.
pub fn overlay_target_size(
    native: (u32, u32),
    size: OverlaySize,
    canvas_width: u32,
    scale: f32,
) -> (u32, u32) {
    let (native_w, native_h) = native;
    if native_w == 0 || native_h == 0 {
        return (0, 0);
    }
    let aspect = native_h as f32 / native_w as f32;

    let width = match size {
        OverlaySize::RelativeWidth(fraction) => fraction * canvas_width as f32,
        OverlaySize::Factor(factor) => native_w as f32 * factor * scale,
        OverlaySize::Width(px) => px as f32 * scale,
        OverlaySize::Height(px) => px as f32 * scale / aspect,
    };
    let height = match size {
        OverlaySize::Height(px) => px as f32 * scale,
        _ => width * aspect,
    };

    (
        (width.round() as u32).max(1),
        (height.round() as u32).max(1),
    )
}

/// Resample an RGBA image with Lanczos3, premultiplying alpha around the
/// convolution so transparent pixels do not bleed color.
pub fn resample(image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, String> {
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    check_pixel_limit(width as f64, height as f64)?;

    let src_width = NonZeroU32::new(image.width()).ok_or("Source width is 0")?;
    let src_height = NonZeroU32::new(image.height()).ok_or("Source height is 0")?;
    let dst_width = NonZeroU32::new(width).ok_or("Target width is 0")?;
    let dst_height = NonZeroU32::new(height).ok_or("Target height is 0")?;

    let mut src_image = Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        PixelType::U8x4,
    )
    .map_err(|e| format!("Failed to create source image: {:?}", e))?;
    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let alpha = MulDiv::default();
    alpha
        .multiply_alpha_inplace(&mut src_image.view_mut())
        .map_err(|e| format!("Failed to premultiply alpha: {:?}", e))?;

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));
    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| format!("Resize operation failed: {:?}", e))?;

    alpha
        .divide_alpha_inplace(&mut dst_image.view_mut())
        .map_err(|e| format!("Failed to restore alpha: {:?}", e))?;

    RgbaImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| "Failed to create output image buffer".to_string())
}

/// Render an image watermark layer.
///
/// # Arguments
///
/// * `overlay` - Overlay path and size rule
/// * `opacity` - Multiplied into every pixel's alpha
/// * `canvas_width` - Width of the canvas the layer will be composited onto
/// * `scale` - Render scale (target resolution / source resolution)
/// * `cache` - Decoded overlay cache
pub fn render_overlay(
    overlay: &ImageWatermark,
    opacity: f32,
    canvas_width: u32,
    scale: f32,
    cache: &OverlayCache,
) -> Result<RgbaImage, WatermarkError> {
    let source = cache.get_or_load(&overlay.path)?;
    let (width, height) =
        overlay_target_size(source.image.dimensions(), overlay.size, canvas_width, scale);
    if width == 0 || height == 0 {
        return Ok(RgbaImage::new(0, 0));
    }
    check_pixel_limit(width as f64, height as f64).map_err(|reason| {
        WatermarkError::Render(format!("Overlay {}: {}", overlay.path.display(), reason))
    })?;

    let mut layer = resample(&source.image, width, height).map_err(WatermarkError::Render)?;

    let opacity = opacity.clamp(0.0, 1.0);
    if opacity < 1.0 {
        for pixel in layer.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }
    }
    Ok(layer)
}
