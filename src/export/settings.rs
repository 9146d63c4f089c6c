//! Export settings
//!
//! Output format, quality, destination, naming rule and optional resize.
//! Settings are plain data: they are saved in templates and in the session
//! file, and snapshotted into export jobs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_NAME_SUFFIX, MAX_RESIZE_EDGE, MAX_RESIZE_PERCENT,
};
use crate::watermark::Color;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn supports_transparency(&self) -> bool {
        matches!(self, Self::Png)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// How output file names are derived from source names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingRule {
    /// Same stem as the source
    KeepOriginal,
    /// Text prepended to the stem
    Prefix(String),
    /// Text appended to the stem
    Suffix(String),
}

impl Default for NamingRule {
    fn default() -> Self {
        NamingRule::Suffix(DEFAULT_NAME_SUFFIX.to_string())
    }
}

/// Aspect-preserving output resize
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeSpec {
    /// Target width in pixels
    Width(u32),
    /// Target height in pixels
    Height(u32),
    /// Percentage of the source size (100 = unchanged)
    Percent(f32),
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_background() -> Color {
    Color::white()
}

/// Everything that controls how a watermarked image is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub format: OutputFormat,

    /// JPEG quality 1-100 (default: 90)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Destination folder; `None` writes next to each source
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Allow writing into a source's own folder
    #[serde(default)]
    pub allow_source_dir: bool,

    #[serde(default)]
    pub naming: NamingRule,

    #[serde(default)]
    pub resize: Option<ResizeSpec>,

    /// Color transparent areas are flattened onto for JPEG (default: white)
    #[serde(default = "default_background")]
    pub background: Color,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            output_dir: None,
            allow_source_dir: false,
            naming: NamingRule::default(),
            resize: None,
            background: default_background(),
        }
    }
}

impl ExportSettings {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_naming(mut self, naming: NamingRule) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_resize(mut self, resize: ResizeSpec) -> Self {
        self.resize = Some(resize);
        self
    }

    /// Validate the export settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }

        match &self.naming {
            NamingRule::Prefix(text) | NamingRule::Suffix(text) => {
                if text.is_empty() {
                    return Err("Naming prefix/suffix cannot be empty".to_string());
                }
                if text.contains(['/', '\\']) {
                    return Err(format!(
                        "Naming prefix/suffix cannot contain path separators: '{}'",
                        text
                    ));
                }
            }
            NamingRule::KeepOriginal => {}
        }

        match self.resize {
            Some(ResizeSpec::Width(0)) | Some(ResizeSpec::Height(0)) => {
                return Err("Resize target cannot be zero".to_string());
            }
            Some(ResizeSpec::Width(edge)) | Some(ResizeSpec::Height(edge))
                if edge > MAX_RESIZE_EDGE =>
            {
                return Err(format!(
                    "Resize target {} exceeds the maximum edge of {}",
                    edge, MAX_RESIZE_EDGE
                ));
            }
            Some(ResizeSpec::Percent(p)) if !p.is_finite() || p <= 0.0 => {
                return Err(format!("Resize percent must be positive, got {}", p));
            }
            Some(ResizeSpec::Percent(p)) if p > MAX_RESIZE_PERCENT => {
                return Err(format!(
                    "Resize percent {} exceeds the maximum of {}",
                    p, MAX_RESIZE_PERCENT
                ));
            }
            _ => {}
        }

        Ok(())
    }
}
