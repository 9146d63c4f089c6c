//! Watermark module for rendering text and image watermarks onto images.
//!
//! This module owns the whole rendering core: the declarative watermark
//! model, geometry resolution, text rasterization, overlay scaling,
//! compositing, and the interactive preview helpers. The export pipeline and
//! the preview both go through [`RenderContext::render_watermark`], so the
//! two always agree on where the watermark lands.
//!
//! # Features
//!
//! - **Text watermarks** with font family, bold/italic, fill color, drop
//!   shadow and outline stroke
//! - **Image watermarks** from local files (with an in-memory cache),
//!   scaled proportionally
//! - **9 anchor presets** with a border margin, or a free-form position set
//!   by dragging on the preview
//! - Rotation about the watermark center and a global opacity
//!
//! # Configuration Example
//!
//! ```yaml
//! content:
//!   type: text
//!   text: "SAMPLE"
//!   font_size: 48
//!   stroke:
//!     enabled: true
//! placement:
//!   anchor: bottom-right
//! rotation: -30
//! opacity: 0.5
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod fonts;
pub mod image_overlay;
pub mod position;
pub mod preview;
pub mod processor;
pub mod text_renderer;

// Re-export main types for convenience
pub use compositor::{apply_to_dynamic, apply_watermark, WatermarkLayer};
pub use config::{
    parse_hex_color, Anchor, Color, ImageWatermark, OverlaySize, Placement, ShadowStyle,
    StrokeStyle, TextWatermark, WatermarkConfig, WatermarkContent,
};
pub use error::WatermarkError;
pub use fonts::{FaceStyle, FontBook};
pub use image_overlay::{overlay_target_size, render_overlay, resample, OverlayCache};
pub use position::{
    check_pixel_limit, is_visible, nearest_anchor, normalized_center, resolve_placement,
    rotated_bounds, ImageDimensions, Rect, ResolvedPlacement, WatermarkDimensions,
};
pub use preview::{DragSession, PreviewFrame, PreviewSource};
pub use processor::RenderContext;
pub use text_renderer::{measure_text, render_text};
