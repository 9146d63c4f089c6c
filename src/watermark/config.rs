//! Watermark configuration types.
//!
//! This module defines the declarative watermark model:
//! - Text watermarks (font, size, style, fill, shadow, stroke)
//! - Image watermarks (overlay path and proportional size)
//! - Placement (9-point anchors or a free-form normalized center)
//! - Shared rotation and opacity
//!
//! All sizes are expressed at source-image resolution. Renderers receive a
//! render scale and derive preview or export sizes from it, so the same
//! configuration produces proportionally identical output at any resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_OVERLAY_RELATIVE_WIDTH,
    DEFAULT_SHADOW_OFFSET, DEFAULT_STROKE_WIDTH, DEFAULT_TEXT,
};

// Default values
fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_opacity() -> f32 {
    DEFAULT_OPACITY
}

fn default_shadow_offset() -> i32 {
    DEFAULT_SHADOW_OFFSET
}

fn default_stroke_width() -> f32 {
    DEFAULT_STROKE_WIDTH
}

/// RGBA color, serialized as `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_hex_color(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Parse a hex color string.
///
/// Supports `#RGB`, `#RRGGBB` and `#RRGGBBAA`. Colors without an alpha
/// component are fully opaque.
pub fn parse_hex_color(hex: &str) -> Result<Color, String> {
    let digits = hex
        .strip_prefix('#')
        .ok_or_else(|| format!("Color must be a hex string starting with '#', got '{}'", hex))?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Color contains invalid hex characters: '{}'", hex));
    }

    let byte = |range: std::ops::Range<usize>| -> Result<u8, String> {
        u8::from_str_radix(&digits[range], 16).map_err(|e| e.to_string())
    };

    match digits.len() {
        3 => {
            // Each digit is doubled: 0xF -> 0xFF
            let r = byte(0..1)?;
            let g = byte(1..2)?;
            let b = byte(2..3)?;
            Ok(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?)),
        8 => Ok(Color::rgba(
            byte(0..2)?,
            byte(2..4)?,
            byte(4..6)?,
            byte(6..8)?,
        )),
        n => Err(format!(
            "Color must be #RGB, #RRGGBB or #RRGGBBAA format, got {} digits",
            n
        )),
    }
}

/// One of the nine named reference positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    /// All anchors in row-major order.
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::CenterLeft,
        Anchor::Center,
        Anchor::CenterRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    /// Fractional position of this anchor on each axis.
    pub fn fraction(self) -> (f32, f32) {
        match self {
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::TopCenter => (0.5, 0.0),
            Anchor::TopRight => (1.0, 0.0),
            Anchor::CenterLeft => (0.0, 0.5),
            Anchor::Center => (0.5, 0.5),
            Anchor::CenterRight => (1.0, 0.5),
            Anchor::BottomLeft => (0.0, 1.0),
            Anchor::BottomCenter => (0.5, 1.0),
            Anchor::BottomRight => (1.0, 1.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopCenter => "top-center",
            Anchor::TopRight => "top-right",
            Anchor::CenterLeft => "center-left",
            Anchor::Center => "center",
            Anchor::CenterRight => "center-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomCenter => "bottom-center",
            Anchor::BottomRight => "bottom-right",
        }
    }
}

impl std::str::FromStr for Anchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Anchor::ALL
            .into_iter()
            .find(|anchor| anchor.as_str() == s)
            .ok_or_else(|| format!("Unknown anchor '{}'", s))
    }
}

/// Where the watermark goes on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Preset position, inset from the border by a margin.
    Anchor(Anchor),
    /// Normalized watermark center in `[0, 1] x [0, 1]`, usually from a drag.
    Free { x: f32, y: f32 },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Anchor(Anchor::Center)
    }
}

/// Drop shadow drawn beneath the text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowStyle {
    #[serde(default)]
    pub enabled: bool,

    /// Shadow color (default: black at 40% alpha)
    #[serde(default = "ShadowStyle::default_color")]
    pub color: Color,

    #[serde(default = "default_shadow_offset")]
    pub offset_x: i32,

    #[serde(default = "default_shadow_offset")]
    pub offset_y: i32,

    /// Gaussian blur radius in pixels; 0 gives a hard shadow
    #[serde(default)]
    pub blur_radius: f32,
}

impl ShadowStyle {
    fn default_color() -> Color {
        Color::black().with_alpha(102)
    }
}

impl Default for ShadowStyle {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Self::default_color(),
            offset_x: DEFAULT_SHADOW_OFFSET,
            offset_y: DEFAULT_SHADOW_OFFSET,
            blur_radius: 0.0,
        }
    }
}

/// Outline drawn around (and beneath) the glyph fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "StrokeStyle::default_color")]
    pub color: Color,

    /// Outline width in pixels (default: 2)
    #[serde(default = "default_stroke_width")]
    pub width: f32,
}

impl StrokeStyle {
    fn default_color() -> Color {
        Color::black()
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Self::default_color(),
            width: DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Text watermark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextWatermark {
    pub text: String,

    /// Font family name or path to a font file (default: "DejaVu Sans")
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size in pixels at source resolution (default: 32)
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,

    /// Fill color (default: opaque white)
    #[serde(default = "Color::white")]
    pub color: Color,

    #[serde(default)]
    pub shadow: ShadowStyle,

    #[serde(default)]
    pub stroke: StrokeStyle,
}

impl Default for TextWatermark {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            font_family: default_font_family(),
            font_size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            color: Color::white(),
            shadow: ShadowStyle::default(),
            stroke: StrokeStyle::default(),
        }
    }
}

/// How large an overlay image is drawn. Aspect ratio is always preserved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlaySize {
    /// Overlay width as a fraction of the base image width
    RelativeWidth(f32),
    /// Multiplier on the overlay's native size
    Factor(f32),
    /// Overlay width in pixels at source resolution
    Width(u32),
    /// Overlay height in pixels at source resolution
    Height(u32),
}

impl Default for OverlaySize {
    fn default() -> Self {
        OverlaySize::RelativeWidth(DEFAULT_OVERLAY_RELATIVE_WIDTH)
    }
}

/// Image watermark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageWatermark {
    /// Path to the overlay image
    pub path: PathBuf,

    #[serde(default)]
    pub size: OverlaySize,
}

/// Watermark content - either text or image.
///
/// Uses serde tag to distinguish between types:
/// ```yaml
/// content:
///   type: text
///   text: "SAMPLE"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkContent {
    Text(TextWatermark),
    Image(ImageWatermark),
}

impl WatermarkContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }
}

/// The active watermark: content plus shared placement, rotation and opacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    pub content: WatermarkContent,

    #[serde(default)]
    pub placement: Placement,

    /// Rotation in degrees, clockwise on screen
    #[serde(default)]
    pub rotation: f32,

    /// Opacity from 0.0 (transparent) to 1.0 (opaque) (default: 0.8)
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self::text(TextWatermark::default())
    }
}

impl WatermarkConfig {
    /// Text watermark centered on the canvas.
    pub fn text(text: TextWatermark) -> Self {
        Self {
            content: WatermarkContent::Text(text),
            placement: Placement::default(),
            rotation: 0.0,
            opacity: DEFAULT_OPACITY,
        }
    }

    /// Image watermark centered on the canvas.
    pub fn image(image: ImageWatermark) -> Self {
        Self {
            content: WatermarkContent::Image(image),
            placement: Placement::default(),
            rotation: 0.0,
            opacity: DEFAULT_OPACITY,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_anchor(self, anchor: Anchor) -> Self {
        self.with_placement(Placement::Anchor(anchor))
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Validate the watermark configuration.
    pub fn validate(&self) -> Result<(), String> {
        // Check for NaN/Infinity and valid range
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(format!(
                "Watermark opacity must be a finite value between 0.0 and 1.0, got {}",
                self.opacity
            ));
        }

        if !self.rotation.is_finite() {
            return Err(format!(
                "Watermark rotation must be finite, got {}",
                self.rotation
            ));
        }

        if let Placement::Free { x, y } = self.placement {
            if !x.is_finite() || !y.is_finite() {
                return Err(format!(
                    "Free placement must be finite, got ({}, {})",
                    x, y
                ));
            }
        }

        match &self.content {
            WatermarkContent::Text(text) => text.validate(),
            WatermarkContent::Image(image) => image.validate(),
        }
    }
}

impl TextWatermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Validate the text watermark configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(format!(
                "Text watermark font_size must be a positive number, got {}",
                self.font_size
            ));
        }

        if self.font_family.trim().is_empty() {
            return Err("Text watermark 'font_family' cannot be empty".to_string());
        }

        if !self.stroke.width.is_finite() || self.stroke.width < 0.0 {
            return Err(format!(
                "Text watermark stroke width must be zero or positive, got {}",
                self.stroke.width
            ));
        }

        if !self.shadow.blur_radius.is_finite() || self.shadow.blur_radius < 0.0 {
            return Err(format!(
                "Text watermark shadow blur radius must be zero or positive, got {}",
                self.shadow.blur_radius
            ));
        }

        Ok(())
    }
}

impl ImageWatermark {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: OverlaySize::default(),
        }
    }

    /// Validate the image watermark configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("Image watermark 'path' field cannot be empty".to_string());
        }

        match self.size {
            OverlaySize::RelativeWidth(f) | OverlaySize::Factor(f) => {
                if !f.is_finite() || f <= 0.0 {
                    return Err(format!(
                        "Image watermark scale must be a positive number, got {}",
                        f
                    ));
                }
            }
            OverlaySize::Width(0) | OverlaySize::Height(0) => {
                return Err("Image watermark target size cannot be zero".to_string());
            }
            OverlaySize::Width(_) | OverlaySize::Height(_) => {}
        }

        Ok(())
    }
}
