// Default values shared by the watermark model, export settings and stores.
//
// Serde default functions and `Default` impls refer to these so the same
// value is used whether a field is omitted from a file or built in code.

// =============================================================================
// Watermark defaults
// =============================================================================

/// Default text for a fresh text watermark
pub const DEFAULT_TEXT: &str = "Watermark";

/// Default font family (embedded, always available)
pub const DEFAULT_FONT_FAMILY: &str = "DejaVu Sans";

/// Default font size in pixels at source resolution
pub const DEFAULT_FONT_SIZE: f32 = 32.0;

/// Default watermark opacity
pub const DEFAULT_OPACITY: f32 = 0.8;

/// Default drop shadow offset in pixels (both axes)
pub const DEFAULT_SHADOW_OFFSET: i32 = 2;

/// Default outline width in pixels
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// Default overlay width as a fraction of the base image width
pub const DEFAULT_OVERLAY_RELATIVE_WIDTH: f32 = 0.25;

// =============================================================================
// Geometry defaults
// =============================================================================

/// Inset margin for anchored placement, as a fraction of the shorter canvas side
pub const ANCHOR_MARGIN_RATIO: f32 = 0.02;

/// Shear applied when synthesizing an oblique face
pub const SYNTHETIC_ITALIC_SHEAR: f32 = 0.2;

/// Dilation radius when synthesizing a bold face, as a fraction of the font size
pub const SYNTHETIC_BOLD_RATIO: f32 = 0.03;

/// Largest canvas or layer the renderer will allocate, in pixels (100 MP)
pub const MAX_RENDER_PIXELS: u64 = 100_000_000;

/// Largest explicit resize edge accepted in export settings
pub const MAX_RESIZE_EDGE: u32 = 65_535;

/// Largest resize percentage accepted in export settings
pub const MAX_RESIZE_PERCENT: f32 = 10_000.0;

/// Font file extensions picked up from font directories
pub const FONT_FILE_EXTENSIONS: &[&str] = &["ttf", "otf"];

// =============================================================================
// Preview defaults
// =============================================================================

/// Default longest edge of the interactive preview in pixels
pub const DEFAULT_PREVIEW_MAX_EDGE: u32 = 1024;

/// Default number of decoded overlay images kept in memory
pub const DEFAULT_OVERLAY_CACHE_ENTRIES: u64 = 16;

// =============================================================================
// Export defaults
// =============================================================================

/// Default JPEG quality (1-100)
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default naming suffix
pub const DEFAULT_NAME_SUFFIX: &str = "_watermarked";

/// File extensions accepted as source images (lowercase, without dot)
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

// =============================================================================
// Storage defaults
// =============================================================================

/// Application directory name under the user config directory
pub const APP_DIR_NAME: &str = "watermarker";

/// Templates subdirectory
pub const TEMPLATES_DIR_NAME: &str = "templates";

/// Session-restore file name
pub const SESSION_FILE_NAME: &str = "session.json";

/// Template file extension
pub const TEMPLATE_EXTENSION: &str = "json";
