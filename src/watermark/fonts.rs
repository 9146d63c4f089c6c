//! Font resolution for text watermarks.
//!
//! A [`FontBook`] maps a family name plus bold/italic flags to a parsed
//! `ab_glyph` face. DejaVu Sans (regular, bold, oblique, bold-oblique) is
//! embedded and always available. Additional fonts can be registered from
//! directories; the family name is taken from the file stem with the style
//! suffix removed (`Roboto-BoldItalic.ttf` is family `Roboto`, bold italic).
//!
//! When a family lacks the requested style, the closest face is returned
//! together with flags telling the renderer to synthesize the missing weight
//! or slant.

use ab_glyph::FontArc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::WatermarkError;
use crate::constants::{DEFAULT_FONT_FAMILY, FONT_FILE_EXTENSIONS};

const EMBEDDED_REGULAR: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const EMBEDDED_BOLD: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");
const EMBEDDED_OBLIQUE: &[u8] = include_bytes!("fonts/DejaVuSans-Oblique.ttf");
const EMBEDDED_BOLD_OBLIQUE: &[u8] = include_bytes!("fonts/DejaVuSans-BoldOblique.ttf");

/// Weight/slant combination of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceStyle {
    pub bold: bool,
    pub italic: bool,
}

impl FaceStyle {
    pub const REGULAR: FaceStyle = FaceStyle::new(false, false);
    pub const BOLD: FaceStyle = FaceStyle::new(true, false);
    pub const ITALIC: FaceStyle = FaceStyle::new(false, true);
    pub const BOLD_ITALIC: FaceStyle = FaceStyle::new(true, true);

    pub const fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }

    fn slot(self) -> usize {
        (self.bold as usize) | ((self.italic as usize) << 1)
    }
}

/// A face ready for rasterization.
#[derive(Clone)]
pub struct ResolvedFace {
    pub font: FontArc,
    /// Renderer must embolden the glyphs itself
    pub synthetic_bold: bool,
    /// Renderer must slant the glyphs itself
    pub synthetic_italic: bool,
}

impl std::fmt::Debug for ResolvedFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFace")
            .field("synthetic_bold", &self.synthetic_bold)
            .field("synthetic_italic", &self.synthetic_italic)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
struct Family {
    display_name: String,
    faces: [Option<FontArc>; 4],
}

impl Family {
    /// Closest available face, preferring to keep weight over slant.
    fn closest(&self, want: FaceStyle) -> Option<(FontArc, FaceStyle)> {
        let candidates = [
            want,
            FaceStyle::new(want.bold, false),
            FaceStyle::new(false, want.italic),
            FaceStyle::REGULAR,
        ];
        candidates.into_iter().find_map(|style| {
            self.faces[style.slot()]
                .as_ref()
                .map(|font| (font.clone(), style))
        })
    }
}

/// Registry of font families.
pub struct FontBook {
    families: RwLock<HashMap<String, Family>>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .finish()
    }
}

impl FontBook {
    /// Font book holding the embedded DejaVu Sans family.
    pub fn new() -> Self {
        let book = Self {
            families: RwLock::new(HashMap::new()),
        };
        let embedded = [
            (FaceStyle::REGULAR, EMBEDDED_REGULAR),
            (FaceStyle::BOLD, EMBEDDED_BOLD),
            (FaceStyle::ITALIC, EMBEDDED_OBLIQUE),
            (FaceStyle::BOLD_ITALIC, EMBEDDED_BOLD_OBLIQUE),
        ];
        for (style, data) in embedded {
            match FontArc::try_from_slice(data) {
                Ok(font) => book.insert(DEFAULT_FONT_FAMILY, style, font),
                Err(e) => warn!(style = ?style, error = %e, "Embedded font failed to parse"),
            }
        }
        book
    }

    /// Register a face from raw font data.
    pub fn register_font_data(
        &self,
        family: &str,
        style: FaceStyle,
        data: Vec<u8>,
    ) -> Result<(), WatermarkError> {
        let font = FontArc::try_from_vec(data)
            .map_err(|e| WatermarkError::Font(format!("{}: {}", family, e)))?;
        self.insert(family, style, font);
        Ok(())
    }

    /// Register every `.ttf`/`.otf` file below `dir`.
    ///
    /// Unparseable files are skipped with a warning. Returns the number of
    /// faces registered.
    pub fn register_directory(&self, dir: &Path) -> Result<usize, WatermarkError> {
        if !dir.is_dir() {
            return Err(WatermarkError::Font(format!(
                "Font directory {} does not exist",
                dir.display()
            )));
        }

        let mut registered = 0;
        for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
            let path = entry.path();
            if !entry.file_type().is_file() || !has_font_extension(path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let (family, style) = split_style_suffix(stem);
            let data = match std::fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read font file");
                    continue;
                }
            };
            match self.register_font_data(&family, style, data) {
                Ok(()) => {
                    debug!(path = %path.display(), family = %family, ?style, "Registered font");
                    registered += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping font file"),
            }
        }
        Ok(registered)
    }

    /// Sorted display names of all registered families.
    pub fn families(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .families
            .read()
            .values()
            .map(|f| f.display_name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.read().contains_key(&family_key(family))
    }

    /// Resolve a family name (or font file path) and style to a face.
    ///
    /// Unknown family names fall back to the embedded family. A font file
    /// path that cannot be read or parsed is an error.
    pub fn resolve(
        &self,
        family: &str,
        bold: bool,
        italic: bool,
    ) -> Result<ResolvedFace, WatermarkError> {
        let want = FaceStyle::new(bold, italic);

        if looks_like_font_path(family) {
            let key = family_key(family);
            if !self.families.read().contains_key(&key) {
                let data = std::fs::read(family)
                    .map_err(|e| WatermarkError::Font(format!("{}: {}", family, e)))?;
                self.register_font_data(family, FaceStyle::REGULAR, data)?;
            }
        }

        let families = self.families.read();
        let found = families
            .get(&family_key(family))
            .and_then(|f| f.closest(want));

        let (font, got) = match found {
            Some(hit) => hit,
            None => {
                debug!(family = %family, "Unknown font family, using default");
                families
                    .get(&family_key(DEFAULT_FONT_FAMILY))
                    .and_then(|f| f.closest(want))
                    .ok_or_else(|| WatermarkError::Font("No fonts available".to_string()))?
            }
        };

        Ok(ResolvedFace {
            font,
            synthetic_bold: want.bold && !got.bold,
            synthetic_italic: want.italic && !got.italic,
        })
    }

    fn insert(&self, family: &str, style: FaceStyle, font: FontArc) {
        let mut families = self.families.write();
        let entry = families
            .entry(family_key(family))
            .or_insert_with(|| Family {
                display_name: family.to_string(),
                ..Family::default()
            });
        entry.faces[style.slot()] = Some(font);
    }
}

/// Case-, space- and dash-insensitive lookup key.
fn family_key(family: &str) -> String {
    if looks_like_font_path(family) {
        return family.to_string();
    }
    family
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FONT_FILE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn looks_like_font_path(family: &str) -> bool {
    has_font_extension(Path::new(family))
}

/// Split `Family-BoldItalic` into (`Family`, bold+italic).
fn split_style_suffix(stem: &str) -> (String, FaceStyle) {
    const SUFFIXES: &[(&str, FaceStyle)] = &[
        ("bolditalic", FaceStyle::BOLD_ITALIC),
        ("boldoblique", FaceStyle::BOLD_ITALIC),
        ("bold", FaceStyle::BOLD),
        ("italic", FaceStyle::ITALIC),
        ("oblique", FaceStyle::ITALIC),
        ("regular", FaceStyle::REGULAR),
    ];

    if let Some((family, suffix)) = stem.rsplit_once(['-', '_']) {
        let suffix = suffix.to_ascii_lowercase();
        if let Some((_, style)) = SUFFIXES.iter().find(|(name, _)| *name == suffix) {
            return (family.to_string(), *style);
        }
    }
    (stem.to_string(), FaceStyle::REGULAR)
}
