//! Text watermark rendering.
//!
//! This module rasterizes a [`TextWatermark`] into a transparent RGBA layer
//! that tightly bounds the glyphs plus their stroke and shadow. The layer is
//! handed to the compositor, which takes care of rotation and placement.
//!
//! # Features
//!
//! - Multi-line text with kerning and the font's line spacing
//! - Bold and italic faces, synthesized when the family lacks them
//! - Outline stroke drawn beneath the fill
//! - Drop shadow with optional Gaussian blur
//! - Render scale: font size, stroke width and shadow geometry are given at
//!   source resolution and multiplied by the scale, so a preview and an
//!   export render the same watermark at proportional sizes
//!
//! # Example
//!
//! ```ignore
//! use watermarker::watermark::{fonts::FontBook, text_renderer::render_text, TextWatermark};
//!
//! let fonts = FontBook::new();
//! let text = TextWatermark::new("Copyright 2025");
//! let layer = render_text(&text, 0.5, 1.0, &fonts).unwrap();
//! ```

use ab_glyph::{point, Font, Glyph, PxScale, ScaleFont};
use image::{GrayImage, Luma, RgbaImage};

use super::config::{Color, TextWatermark};
use super::fonts::{FontBook, ResolvedFace};
use super::position::check_pixel_limit;
use super::WatermarkError;
use crate::constants::{SYNTHETIC_BOLD_RATIO, SYNTHETIC_ITALIC_SHEAR};

/// Single-channel coverage buffer in `[0, 1]`.
#[derive(Clone)]
struct Mask {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Mask {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    fn get(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0.0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    fn add(&mut self, x: i64, y: i64, coverage: f32) {
        if coverage <= 0.0 || x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64
        {
            return;
        }
        let value = &mut self.data[y as usize * self.width + x as usize];
        *value = (*value + coverage).min(1.0);
    }

    /// Grow the covered area by `radius` pixels using a disc with a soft edge.
    fn dilate(&self, radius: f32) -> Mask {
        if radius <= 0.0 {
            return self.clone();
        }
        let reach = (radius + 0.5).ceil() as i64;
        let mut kernel = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let dist = ((dx * dx + dy * dy) as f32).sqrt();
                let weight = (radius + 0.5 - dist).clamp(0.0, 1.0);
                if weight > 0.0 {
                    kernel.push((dx, dy, weight));
                }
            }
        }

        let mut out = Mask::new(self.width, self.height);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                let mut best = 0.0f32;
                for &(dx, dy, weight) in &kernel {
                    let v = self.get(x + dx, y + dy) * weight;
                    if v > best {
                        best = v;
                        if best >= 1.0 {
                            break;
                        }
                    }
                }
                out.data[y as usize * self.width + x as usize] = best;
            }
        }
        out
    }

    fn shifted(&self, dx: i64, dy: i64) -> Mask {
        let mut out = Mask::new(self.width, self.height);
        for y in 0..self.height as i64 {
            for x in 0..self.width as i64 {
                out.data[y as usize * self.width + x as usize] = self.get(x - dx, y - dy);
            }
        }
        out
    }

    fn blurred(&self, sigma: f32) -> Mask {
        if sigma <= 0.0 {
            return self.clone();
        }
        let gray = GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([(self.get(x as i64, y as i64) * 255.0).round() as u8])
        });
        let blurred = image::imageops::blur(&gray, sigma);
        Mask {
            width: self.width,
            height: self.height,
            data: blurred.pixels().map(|p| p[0] as f32 / 255.0).collect(),
        }
    }
}

/// Glyph positioned on its line, with the line's baseline.
struct LaidOutGlyph {
    glyph: Glyph,
    baseline: f32,
}

/// Per-render pixel sizes derived from the configuration and render scale.
struct Metrics {
    px: f32,
    bold_radius: f32,
    shear: f32,
    stroke_width: f32,
    shadow_dx: i64,
    shadow_dy: i64,
    shadow_sigma: f32,
}

impl Metrics {
    fn new(text: &TextWatermark, face: &ResolvedFace, scale: f32) -> Self {
        let px = text.font_size * scale;
        Self {
            px,
            bold_radius: if face.synthetic_bold {
                px * SYNTHETIC_BOLD_RATIO
            } else {
                0.0
            },
            shear: if face.synthetic_italic {
                SYNTHETIC_ITALIC_SHEAR
            } else {
                0.0
            },
            stroke_width: if text.stroke.enabled {
                text.stroke.width * scale
            } else {
                0.0
            },
            shadow_dx: (text.shadow.offset_x as f32 * scale).round() as i64,
            shadow_dy: (text.shadow.offset_y as f32 * scale).round() as i64,
            shadow_sigma: text.shadow.blur_radius * scale,
        }
    }

    /// Room needed around the glyph ink for stroke, bold and shadow.
    fn padding(&self, shadow: bool) -> f64 {
        let mut pad = (self.stroke_width + self.bold_radius).ceil() as f64 + 2.0;
        if shadow {
            pad += (self.shadow_dx as f64).abs().max((self.shadow_dy as f64).abs());
            pad += (self.shadow_sigma * 3.0).ceil() as f64;
        }
        pad
    }
}

fn layout(face: &ResolvedFace, metrics: &Metrics, text: &str) -> Vec<LaidOutGlyph> {
    let scale = PxScale::from(metrics.px);
    let scaled = face.font.as_scaled(scale);
    let line_advance = scaled.height() + scaled.line_gap();

    let mut glyphs = Vec::new();
    for (line_index, line) in text.split('\n').enumerate() {
        let baseline = scaled.ascent() + line_index as f32 * line_advance;
        let mut caret = 0.0f32;
        let mut previous = None;
        for c in line.trim_end_matches('\r').chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(LaidOutGlyph {
                glyph: id.with_scale_and_position(scale, point(caret, baseline)),
                baseline,
            });
            caret += scaled.h_advance(id) + metrics.bold_radius;
            previous = Some(id);
        }
    }
    glyphs
}

/// Ink bounds `(min_x, min_y, max_x, max_y)` of the laid out glyphs, sheared.
fn ink_bounds(
    face: &ResolvedFace,
    glyphs: &[LaidOutGlyph],
    shear: f32,
) -> Option<(f32, f32, f32, f32)> {
    glyphs
        .iter()
        .filter_map(|g| {
            face.font.outline_glyph(g.glyph.clone()).map(|outline| {
                let b = outline.px_bounds();
                (
                    b.min.x + shear * (g.baseline - b.max.y),
                    b.min.y,
                    b.max.x + shear * (g.baseline - b.min.y),
                    b.max.y,
                )
            })
        })
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
}

/// Measure the ink extent of a text watermark at the given render scale.
///
/// Stroke and shadow are not included. Returns `(0, 0)` for blank text.
pub fn measure_text(
    text: &TextWatermark,
    scale: f32,
    fonts: &FontBook,
) -> Result<(u32, u32), WatermarkError> {
    check_scale(scale)?;
    if text.text.trim().is_empty() {
        return Ok((0, 0));
    }
    let face = fonts.resolve(&text.font_family, text.bold, text.italic)?;
    let metrics = Metrics::new(text, &face, scale);
    let glyphs = layout(&face, &metrics, &text.text);
    Ok(match ink_bounds(&face, &glyphs, metrics.shear) {
        Some((x0, y0, x1, y1)) => (
            (x1.ceil() - x0.floor()) as u32,
            (y1.ceil() - y0.floor()) as u32,
        ),
        None => (0, 0),
    })
}

/// Render a text watermark to an RGBA layer.
///
/// # Arguments
///
/// * `text` - Text watermark configuration (sizes at source resolution)
/// * `opacity` - Global opacity multiplied into the final alpha
/// * `scale` - Render scale (target resolution / source resolution)
/// * `fonts` - Font book used to resolve the family
///
/// # Returns
///
/// A layer tightly bounding glyphs, stroke and shadow. Blank text yields a
/// 0x0 image, which the compositor treats as a no-op.
pub fn render_text(
    text: &TextWatermark,
    opacity: f32,
    scale: f32,
    fonts: &FontBook,
) -> Result<RgbaImage, WatermarkError> {
    check_scale(scale)?;
    if text.text.trim().is_empty() {
        return Ok(RgbaImage::new(0, 0));
    }

    let face = fonts.resolve(&text.font_family, text.bold, text.italic)?;
    let metrics = Metrics::new(text, &face, scale);
    let glyphs = layout(&face, &metrics, &text.text);

    let Some((min_x, min_y, max_x, max_y)) = ink_bounds(&face, &glyphs, metrics.shear) else {
        return Ok(RgbaImage::new(0, 0));
    };

    let pad = metrics.padding(text.shadow.enabled);
    let width = (max_x.ceil() - min_x.floor()) as f64 + 2.0 * pad;
    let height = (max_y.ceil() - min_y.floor()) as f64 + 2.0 * pad;
    check_pixel_limit(width, height)
        .map_err(|reason| WatermarkError::Render(format!("Text layer: {}", reason)))?;

    let pad = pad as i64;
    let origin_x = pad - min_x.floor() as i64;
    let origin_y = pad - min_y.floor() as i64;
    let (width, height) = (width as i64, height as i64);

    let mut fill = Mask::new(width as usize, height as usize);
    for laid in &glyphs {
        let Some(outline) = face.font.outline_glyph(laid.glyph.clone()) else {
            continue;
        };
        let bounds = outline.px_bounds();
        outline.draw(|gx, gy, coverage| {
            let y = bounds.min.y + gy as f32;
            let x = bounds.min.x + gx as f32 + metrics.shear * (laid.baseline - (y + 0.5));
            let fx = x + origin_x as f32;
            let x0 = fx.floor();
            let frac = fx - x0;
            let row = y as i64 + origin_y;
            fill.add(x0 as i64, row, coverage * (1.0 - frac));
            fill.add(x0 as i64 + 1, row, coverage * frac);
        });
    }

    let fill = fill.dilate(metrics.bold_radius);
    let silhouette = if metrics.stroke_width > 0.0 {
        Some(fill.dilate(metrics.stroke_width))
    } else {
        None
    };

    let mut canvas = vec![[0.0f32; 4]; fill.data.len()];

    if text.shadow.enabled {
        let shadow = silhouette
            .as_ref()
            .unwrap_or(&fill)
            .shifted(metrics.shadow_dx, metrics.shadow_dy)
            .blurred(metrics.shadow_sigma);
        paint(&mut canvas, &shadow, text.shadow.color);
    }
    if let Some(stroke) = &silhouette {
        paint(&mut canvas, stroke, text.stroke.color);
    }
    paint(&mut canvas, &fill, text.color);

    Ok(crop_to_rgba(
        &canvas,
        fill.width,
        fill.height,
        opacity.clamp(0.0, 1.0),
    ))
}

fn check_scale(scale: f32) -> Result<(), WatermarkError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(WatermarkError::Render(format!(
            "Render scale must be positive, got {}",
            scale
        )));
    }
    Ok(())
}

/// Composite a colored mask over a premultiplied canvas.
fn paint(canvas: &mut [[f32; 4]], mask: &Mask, color: Color) {
    let color_alpha = color.a as f32 / 255.0;
    let rgb = [
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
    ];
    for (dst, &coverage) in canvas.iter_mut().zip(&mask.data) {
        let a = coverage * color_alpha;
        if a <= 0.0 {
            continue;
        }
        let keep = 1.0 - a;
        dst[0] = rgb[0] * a + dst[0] * keep;
        dst[1] = rgb[1] * a + dst[1] * keep;
        dst[2] = rgb[2] * a + dst[2] * keep;
        dst[3] = a + dst[3] * keep;
    }
}

/// Crop to visible pixels, un-premultiply and apply opacity.
///
/// The crop uses alpha before opacity so the layer size does not depend on
/// the opacity setting.
fn crop_to_rgba(canvas: &[[f32; 4]], width: usize, height: usize, opacity: f32) -> RgbaImage {
    const VISIBLE: f32 = 0.5 / 255.0;

    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for y in 0..height {
        for x in 0..width {
            if canvas[y * width + x][3] >= VISIBLE {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if min_x == usize::MAX {
        return RgbaImage::new(0, 0);
    }

    let out_w = (max_x - min_x + 1) as u32;
    let out_h = (max_y - min_y + 1) as u32;
    RgbaImage::from_fn(out_w, out_h, |x, y| {
        let [r, g, b, a] = canvas[(y as usize + min_y) * width + x as usize + min_x];
        if a <= 0.0 {
            return image::Rgba([0, 0, 0, 0]);
        }
        let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        image::Rgba([to_u8(r / a), to_u8(g / a), to_u8(b / a), to_u8(a * opacity)])
    })
}
