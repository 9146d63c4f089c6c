//! Position calculation for watermark placement.
//!
//! This module resolves a [`Placement`] into absolute pixel coordinates on a
//! canvas of arbitrary size.
//!
//! # Conventions
//!
//! - The resolved `(x, y)` is the top-left corner of the **unrotated**
//!   watermark box. The rotation pivot is always the box center.
//! - Anchored placement insets the rotated bounding box by a margin of 2% of
//!   the shorter canvas side, so watermarks never touch the border.
//! - Free placement is the normalized watermark center. It bypasses the
//!   margin; the center is clamped to the canvas, so a watermark may hang
//!   partially off-canvas but never leaves it entirely.
//!
//! Everything is computed in `f32` from the current canvas size, so the same
//! placement on a 400px preview and a 4000px export differs only by the
//! scale factor.
//!
//! # Example
//!
//! ```ignore
//! use watermarker::watermark::position::{resolve_placement, ImageDimensions, WatermarkDimensions};
//! use watermarker::watermark::{Anchor, Placement};
//!
//! let image = ImageDimensions { width: 800, height: 600 };
//! let watermark = WatermarkDimensions { width: 100, height: 50 };
//!
//! let pos = resolve_placement(&Placement::Anchor(Anchor::BottomRight), &image, &watermark, 0.0);
//! assert_eq!((pos.x, pos.y), (688.0, 538.0)); // margin = 2% of 600 = 12
//! ```

use super::{Anchor, Placement};
use crate::constants::{ANCHOR_MARGIN_RATIO, MAX_RENDER_PIXELS};

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &image::RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }
}

/// Dimensions of the watermark to be placed (post-scale, pre-rotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

impl WatermarkDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &image::RgbaImage) -> Self {
        Self::new(image.width(), image.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.width && py < self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Where a watermark layer lands on a specific canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPlacement {
    /// Left edge of the unrotated layer box
    pub x: f32,
    /// Top edge of the unrotated layer box
    pub y: f32,
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation about the box center, in degrees
    pub rotation: f32,
}

impl ResolvedPlacement {
    /// Rotation pivot (the layer center).
    pub fn center(&self) -> (f32, f32) {
        (
            self.x + self.width as f32 / 2.0,
            self.y + self.height as f32 / 2.0,
        )
    }

    /// Bounding box of the rotated layer.
    pub fn bounds(&self) -> Rect {
        let (cx, cy) = self.center();
        let (rw, rh) = rotated_bounds(self.width, self.height, self.rotation);
        Rect {
            x: cx - rw / 2.0,
            y: cy - rh / 2.0,
            width: rw,
            height: rh,
        }
    }

    /// Whether the rotation is a no-op.
    pub fn is_axis_aligned(&self) -> bool {
        self.rotation.rem_euclid(360.0).abs() < f32::EPSILON
    }
}

/// Margin applied to anchored placement.
pub fn anchor_margin(image: &ImageDimensions) -> f32 {
    image.width.min(image.height) as f32 * ANCHOR_MARGIN_RATIO
}

/// Size of the axis-aligned box enclosing a `width x height` box rotated by
/// `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (f32, f32) {
    let radians = degrees.to_radians();
    let cos = radians.cos().abs();
    let sin = radians.sin().abs();
    let w = width as f32;
    let h = height as f32;
    (w * cos + h * sin, w * sin + h * cos)
}

/// Resolve a placement into absolute coordinates on the given canvas.
///
/// # Arguments
///
/// * `placement` - Anchor preset or free-form normalized center
/// * `image` - Dimensions of the target canvas
/// * `watermark` - Dimensions of the watermark layer before rotation
/// * `rotation` - Clockwise rotation in degrees
///
/// # Returns
///
/// The top-left corner of the unrotated layer box plus its size and rotation.
/// Coordinates may be negative if the watermark is larger than the canvas.
pub fn resolve_placement(
    placement: &Placement,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    rotation: f32,
) -> ResolvedPlacement {
    let img_w = image.width as f32;
    let img_h = image.height as f32;

    let (cx, cy) = match *placement {
        Placement::Anchor(anchor) => {
            let (rw, rh) = rotated_bounds(watermark.width, watermark.height, rotation);
            let (fx, fy) = anchor.fraction();
            let m = anchor_margin(image);
            (
                fx * (img_w - rw) + (1.0 - 2.0 * fx) * m + rw / 2.0,
                fy * (img_h - rh) + (1.0 - 2.0 * fy) * m + rh / 2.0,
            )
        }
        Placement::Free { x, y } => (x.clamp(0.0, 1.0) * img_w, y.clamp(0.0, 1.0) * img_h),
    };

    ResolvedPlacement {
        x: cx - watermark.width as f32 / 2.0,
        y: cy - watermark.height as f32 / 2.0,
        width: watermark.width,
        height: watermark.height,
        rotation,
    }
}

/// Normalized center a placement resolves to on the given canvas.
///
/// Used to turn an anchored watermark into a free one without moving it,
/// e.g. when a drag starts.
pub fn normalized_center(
    placement: &Placement,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    rotation: f32,
) -> (f32, f32) {
    if image.width == 0 || image.height == 0 {
        return (0.5, 0.5);
    }
    let (cx, cy) = resolve_placement(placement, image, watermark, rotation).center();
    (cx / image.width as f32, cy / image.height as f32)
}

/// Nearest of the nine anchors to a normalized position (thirds grid).
pub fn nearest_anchor(x: f32, y: f32) -> Anchor {
    let bucket = |v: f32| -> usize {
        if v < 0.33 {
            0
        } else if v <= 0.66 {
            1
        } else {
            2
        }
    };
    Anchor::ALL[bucket(y) * 3 + bucket(x)]
}

/// Check if a placement is at least partially visible within the canvas.
pub fn is_visible(placement: &ResolvedPlacement, image: &ImageDimensions) -> bool {
    if placement.width == 0 || placement.height == 0 {
        return false;
    }
    let bounds = placement.bounds();
    bounds.x < image.width as f32
        && bounds.y < image.height as f32
        && bounds.x + bounds.width > 0.0
        && bounds.y + bounds.height > 0.0
}

/// Reject a raster of `width` x `height` pixels before it is allocated.
///
/// Sizes are taken as floats so oversized requests are caught before they
/// saturate when cast to `u32`.
pub fn check_pixel_limit(width: f64, height: f64) -> Result<(), String> {
    if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
        return Err(format!("Invalid raster size {}x{}", width, height));
    }
    if width * height > MAX_RENDER_PIXELS as f64 {
        return Err(format!(
            "Raster of {:.0}x{:.0} exceeds the limit of {} pixels",
            width, height, MAX_RENDER_PIXELS
        ));
    }
    Ok(())
}
