// Shared fixtures for integration tests

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const BASE_COLOR: Rgba<u8> = Rgba([40, 80, 120, 255]);

/// Write a solid-color PNG and return its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, BASE_COLOR)
        .save(&path)
        .unwrap();
    path
}

/// Write `count` solid PNGs named img0.png, img1.png, ...
pub fn write_pngs(dir: &Path, count: usize, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|i| write_png(dir, &format!("img{}.png", i), width, height))
        .collect()
}

/// A file with an image extension but garbage content.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"this is not a png").unwrap();
    path
}

/// Bounding box (x0, y0, x1, y1) of pixels that differ from `BASE_COLOR`
/// by more than `threshold` on any channel.
pub fn changed_bbox(image: &RgbaImage, threshold: u8) -> Option<(u32, u32, u32, u32)> {
    let mut bbox: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        let differs = (0..4).any(|c| pixel[c].abs_diff(BASE_COLOR[c]) > threshold);
        if differs {
            bbox = Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bbox
}

/// Bounding box normalized by image size.
pub fn normalized_bbox(image: &RgbaImage, threshold: u8) -> Option<[f32; 4]> {
    let (w, h) = (image.width() as f32, image.height() as f32);
    changed_bbox(image, threshold).map(|(x0, y0, x1, y1)| {
        [
            x0 as f32 / w,
            y0 as f32 / h,
            (x1 + 1) as f32 / w,
            (y1 + 1) as f32 / h,
        ]
    })
}

/// Number of regular files directly inside `dir`.
pub fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
