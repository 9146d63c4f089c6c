//! Source image loading and discovery.
//!
//! Sources are decoded to RGBA with their EXIF orientation applied, so the
//! watermark lands where the user sees it rather than where the sensor wrote
//! the pixels. Directories passed on the command line are expanded into the
//! supported image files they contain.

use image::DynamicImage;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::SUPPORTED_INPUT_EXTENSIONS;
use crate::watermark::WatermarkError;

/// Whether the file extension is one of the supported input formats.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode a source image with its EXIF orientation applied.
///
/// # Errors
///
/// Returns `WatermarkError::AssetLoad` if the file cannot be opened or
/// decoded.
pub fn load_source(path: &Path) -> Result<DynamicImage, WatermarkError> {
    let image = image::io::Reader::open(path)
        .map_err(|e| WatermarkError::asset_load(path, e))?
        .with_guessed_format()
        .map_err(|e| WatermarkError::asset_load(path, e))?
        .decode()
        .map_err(|e| WatermarkError::asset_load(path, e))?;

    let orientation = read_orientation(path);
    if orientation != 1 {
        debug!(path = %path.display(), orientation, "Applying EXIF orientation");
    }
    Ok(apply_orientation(image, orientation))
}

/// EXIF orientation tag (1-8), or 1 when absent or unreadable.
pub fn read_orientation(path: &Path) -> u32 {
    let Ok(file) = File::open(path) else {
        return 1;
    };
    let mut reader = BufReader::new(file);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) else {
        return 1;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .filter(|value| (1..=8).contains(value))
        .unwrap_or(1)
}

/// Transform pixels so that orientation 1 (upright) results.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Expand input paths into a list of source images.
///
/// Files are kept as given (a missing or unsupported file then fails at
/// export time with a proper error). Directories contribute their supported
/// images in file-name order, descending into subdirectories only when
/// `recursive` is set. Duplicates are dropped, first occurrence wins.
pub fn collect_images(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .max_depth(max_depth)
                .follow_links(true)
                .sort_by_file_name();
            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_supported_image(entry.path()) => {
                        let found = entry.into_path();
                        if seen.insert(found.clone()) {
                            images.push(found);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
                }
            }
        } else if seen.insert(path.clone()) {
            images.push(path.clone());
        }
    }

    debug!(inputs = paths.len(), images = images.len(), "Collected source images");
    images
}
