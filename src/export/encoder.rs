//! Image encoder abstraction
//!
//! A small trait over the output formats so the pipeline does not care
//! which one it writes. JPEG has no alpha channel, so it flattens the image
//! onto a background color first.

use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::codecs::png::PngEncoder as ImagePngEncoder;
use image::ImageEncoder as _;
use image::RgbaImage;
use std::io::Cursor;

use super::error::ExportError;
use super::settings::{ExportSettings, OutputFormat};
use crate::watermark::Color;

/// Trait for image encoders
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode an RGBA image to the target format
    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, ExportError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool {
        self.format().supports_transparency()
    }
}

/// JPEG encoder using the image crate
pub struct JpegEncoder {
    /// Quality value (1-100, where 100 is best quality)
    pub quality: u8,
    /// Color that transparent pixels are flattened onto
    pub background: Color,
}

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
        let rgb_data = flatten_onto(image, self.background);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.quality.clamp(1, 100));
        encoder
            .write_image(
                &rgb_data,
                image.width(),
                image.height(),
                image::ColorType::Rgb8,
            )
            .map_err(|e| ExportError::encode_failed("jpeg", e))?;

        Ok(output.into_inner())
    }
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )
            .map_err(|e| ExportError::encode_failed("png", e))?;

        Ok(output.into_inner())
    }
}

/// Factory for creating encoders from export settings
pub struct EncoderFactory;

impl EncoderFactory {
    pub fn create(settings: &ExportSettings) -> Box<dyn ImageEncoder> {
        match settings.format {
            OutputFormat::Jpeg => Box::new(JpegEncoder {
                quality: settings.jpeg_quality,
                background: settings.background,
            }),
            OutputFormat::Png => Box::new(PngEncoder),
        }
    }
}

/// Composite RGBA over an opaque background and drop alpha.
fn flatten_onto(image: &RgbaImage, background: Color) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    let bg = [background.r, background.g, background.b];

    for pixel in image.pixels() {
        let alpha = pixel[3] as u32;
        for c in 0..3 {
            let value = (pixel[c] as u32 * alpha + bg[c] as u32 * (255 - alpha) + 127) / 255;
            rgb.push(value as u8);
        }
    }

    rgb
}
