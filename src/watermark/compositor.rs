//! Watermark compositor for blending a rendered layer onto an image.
//!
//! This module handles rotation and alpha blending of a watermark layer at
//! a resolved placement.
//!
//! # Features
//!
//! - Porter-Duff "over" with premultiplied sampling
//! - Rotation about the layer center with bilinear sampling
//! - Silent clipping of anything outside the target
//! - Pixels with zero layer alpha leave the target bit-exact
//!
//! # Example
//!
//! ```ignore
//! use watermarker::watermark::compositor::{apply_watermark, WatermarkLayer};
//! use watermarker::watermark::position::resolve_placement;
//!
//! let placement = resolve_placement(&config.placement, &image_dims, &layer_dims, config.rotation);
//! apply_watermark(&mut target_image, &WatermarkLayer::new(layer_image, placement));
//! ```

use super::position::ResolvedPlacement;
use image::{DynamicImage, Rgba, RgbaImage};

/// A rendered watermark layer and where it goes.
#[derive(Clone)]
pub struct WatermarkLayer {
    /// The watermark image (RGBA, opacity already applied).
    pub image: RgbaImage,
    /// Placement on the target, including rotation.
    pub placement: ResolvedPlacement,
}

impl std::fmt::Debug for WatermarkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("placement", &self.placement)
            .finish()
    }
}

impl WatermarkLayer {
    pub fn new(image: RgbaImage, placement: ResolvedPlacement) -> Self {
        Self { image, placement }
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

/// Composite a layer onto the target image in place.
///
/// Empty layers are a no-op.
pub fn apply_watermark(target: &mut RgbaImage, layer: &WatermarkLayer) {
    if layer.is_empty() || target.width() == 0 || target.height() == 0 {
        return;
    }
    if layer.placement.is_axis_aligned() {
        blend_direct(target, layer);
    } else {
        blend_rotated(target, layer);
    }
}

/// Composite onto a dynamic image and return the result.
pub fn apply_to_dynamic(target: &DynamicImage, layer: &WatermarkLayer) -> DynamicImage {
    let mut rgba = target.to_rgba8();
    apply_watermark(&mut rgba, layer);
    DynamicImage::ImageRgba8(rgba)
}

/// Unrotated layer: snap to whole pixels and blend 1:1.
fn blend_direct(target: &mut RgbaImage, layer: &WatermarkLayer) {
    let target_width = target.width() as i64;
    let target_height = target.height() as i64;

    let pos_x = layer.placement.x.round() as i64;
    let pos_y = layer.placement.y.round() as i64;
    let wm_width = layer.image.width() as i64;
    let wm_height = layer.image.height() as i64;

    // Visible region
    let x_start = pos_x.max(0);
    let y_start = pos_y.max(0);
    let x_end = (pos_x + wm_width).min(target_width);
    let y_end = (pos_y + wm_height).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wm_pixel = layer.image.get_pixel((tx - pos_x) as u32, (ty - pos_y) as u32);
            if wm_pixel[3] == 0 {
                continue;
            }
            let a = wm_pixel[3] as f32 / 255.0;
            let premultiplied = [
                wm_pixel[0] as f32 / 255.0 * a,
                wm_pixel[1] as f32 / 255.0 * a,
                wm_pixel[2] as f32 / 255.0 * a,
                a,
            ];
            let target_pixel = target.get_pixel_mut(tx as u32, ty as u32);
            *target_pixel = blend_over(*target_pixel, premultiplied);
        }
    }
}

/// Rotated layer: inverse-map each target pixel into layer space.
fn blend_rotated(target: &mut RgbaImage, layer: &WatermarkLayer) {
    let bounds = layer.placement.bounds();
    let (cx, cy) = layer.placement.center();
    let radians = layer.placement.rotation.to_radians();
    let (sin, cos) = radians.sin_cos();

    let half_w = layer.image.width() as f32 / 2.0;
    let half_h = layer.image.height() as f32 / 2.0;

    let x_start = (bounds.x.floor() as i64).max(0);
    let y_start = (bounds.y.floor() as i64).max(0);
    let x_end = ((bounds.x + bounds.width).ceil() as i64).min(target.width() as i64);
    let y_end = ((bounds.y + bounds.height).ceil() as i64).min(target.height() as i64);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let dx = tx as f32 + 0.5 - cx;
            let dy = ty as f32 + 0.5 - cy;
            // Undo a clockwise rotation
            let u = cos * dx + sin * dy;
            let v = -sin * dx + cos * dy;

            let sample = sample_bilinear(&layer.image, u + half_w - 0.5, v + half_h - 0.5);
            if sample[3] <= 0.0 {
                continue;
            }
            let target_pixel = target.get_pixel_mut(tx as u32, ty as u32);
            *target_pixel = blend_over(*target_pixel, sample);
        }
    }
}

/// Premultiplied bilinear sample; pixels outside the layer are transparent.
fn sample_bilinear(image: &RgbaImage, sx: f32, sy: f32) -> [f32; 4] {
    let width = image.width() as i64;
    let height = image.height() as i64;
    if sx <= -1.0 || sy <= -1.0 || sx >= width as f32 || sy >= height as f32 {
        return [0.0; 4];
    }

    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let premultiplied_at = |x: i64, y: i64| -> [f32; 4] {
        if x < 0 || y < 0 || x >= width || y >= height {
            return [0.0; 4];
        }
        let p = image.get_pixel(x as u32, y as u32);
        let a = p[3] as f32 / 255.0;
        [
            p[0] as f32 / 255.0 * a,
            p[1] as f32 / 255.0 * a,
            p[2] as f32 / 255.0 * a,
            a,
        ]
    };

    let p00 = premultiplied_at(x0, y0);
    let p10 = premultiplied_at(x0 + 1, y0);
    let p01 = premultiplied_at(x0, y0 + 1);
    let p11 = premultiplied_at(x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        out[c] = p00[c] * (1.0 - fx) * (1.0 - fy)
            + p10[c] * fx * (1.0 - fy)
            + p01[c] * (1.0 - fx) * fy
            + p11[c] * fx * fy;
    }
    out
}

/// Porter-Duff "over" of a premultiplied source onto a straight-alpha pixel.
fn blend_over(background: Rgba<u8>, source: [f32; 4]) -> Rgba<u8> {
    let src_alpha = source[3].clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = src_alpha + bg_alpha * (1.0 - src_alpha);

    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |src: f32, bg: u8| -> u8 {
        let bg = bg as f32 / 255.0;
        let result = (src + bg * bg_alpha * (1.0 - src_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(source[0], background[0]),
        blend_channel(source[1], background[1]),
        blend_channel(source[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
