// Preview and drag positioning against full-resolution rendering

use image::{Rgba, RgbaImage};
use tempfile::TempDir;
use watermarker::watermark::{
    resample, DragSession, ImageDimensions, ImageWatermark, OverlaySize, Placement,
    PreviewSource, Rect, RenderContext, TextWatermark, WatermarkConfig,
};

use super::test_harness::{write_png, BASE_COLOR};

fn text_config() -> WatermarkConfig {
    let mut text = TextWatermark::new("PROOF");
    text.font_size = 120.0;
    WatermarkConfig::text(text).with_opacity(1.0)
}

/// Test: The preview shows the watermark where the export puts it
#[test]
fn test_preview_bounds_match_export_geometry() {
    let ctx = RenderContext::new();
    let source = RgbaImage::from_pixel(2000, 1000, BASE_COLOR);
    let config = text_config().with_rotation(20.0);

    let preview = PreviewSource::new(source, 500).unwrap();
    let frame = preview.render(&config, &ctx).unwrap();
    let preview_bounds = frame.watermark_bounds.expect("watermark drawn");

    let full = ctx
        .render_layer(&config, ImageDimensions::new(2000, 1000), 1.0)
        .unwrap();
    let full_bounds = full.placement.bounds();

    let scale = frame.scale;
    let tolerance = 24.0;
    assert!((preview_bounds.x / scale - full_bounds.x).abs() < tolerance);
    assert!((preview_bounds.y / scale - full_bounds.y).abs() < tolerance);
    assert!((preview_bounds.width / scale - full_bounds.width).abs() < tolerance);
    assert!((preview_bounds.height / scale - full_bounds.height).abs() < tolerance);
}

/// Test: Dragging on the preview yields a placement that lands at the same
/// relative spot at full resolution
#[test]
fn test_drag_on_preview_resolves_at_full_resolution() {
    let ctx = RenderContext::new();
    let preview = PreviewSource::new(RgbaImage::from_pixel(2000, 1000, BASE_COLOR), 500).unwrap();
    let config = text_config();
    let frame = preview.render(&config, &ctx).unwrap();

    let (cx, cy) = frame.watermark_bounds.unwrap().center();
    let drag = DragSession::begin(&frame, (cx, cy)).expect("pointer on watermark");
    let placement = drag.update((100.0, 50.0));
    assert_eq!(placement, Placement::Free { x: 0.2, y: 0.2 });

    let moved = config.clone().with_placement(placement);
    let full = ctx
        .render_layer(&moved, ImageDimensions::new(2000, 1000), 1.0)
        .unwrap();
    let (fx, fy) = full.placement.center();
    assert!((fx - 400.0).abs() < 1.0, "center x {}", fx);
    assert!((fy - 200.0).abs() < 1.0, "center y {}", fy);

    // Re-rendered preview follows the drag
    let frame = preview.render(&moved, &ctx).unwrap();
    let (px, py) = frame.watermark_bounds.unwrap().center();
    assert!((px - 100.0).abs() < 1.0 && (py - 50.0).abs() < 1.0);
}

/// Test: Dragging past the edge clamps the center to the image
#[test]
fn test_drag_past_edge_is_clamped() {
    let ctx = RenderContext::new();
    let preview = PreviewSource::new(RgbaImage::from_pixel(400, 300, BASE_COLOR), 1024).unwrap();
    let frame = preview.render(&text_config(), &ctx).unwrap();

    let (cx, cy) = frame.watermark_bounds.unwrap().center();
    let drag = DragSession::begin(&frame, (cx, cy)).unwrap();
    assert_eq!(
        drag.update((-500.0, 10_000.0)),
        Placement::Free { x: 0.0, y: 1.0 }
    );
}

/// Test: A drag that misses the watermark does not start
#[test]
fn test_drag_outside_watermark_ignored() {
    let ctx = RenderContext::new();
    let preview = PreviewSource::new(RgbaImage::from_pixel(400, 300, BASE_COLOR), 1024).unwrap();
    let frame = preview.render(&text_config(), &ctx).unwrap();
    assert!(DragSession::begin(&frame, (1.0, 1.0)).is_none());
    assert!(!frame.hit_test(1.0, 1.0));
}

/// Test: Preview opens files with the same loader as export
#[test]
fn test_preview_open_from_file() {
    let temp = TempDir::new().unwrap();
    let path = write_png(temp.path(), "photo.png", 1600, 1200);

    let preview = PreviewSource::open(&path, 400).unwrap();
    assert_eq!(preview.source_size(), (1600, 1200));
    assert_eq!(preview.preview_size(), (400, 300));

    let frame = preview.render(&text_config(), &RenderContext::new()).unwrap();
    assert_eq!(frame.image.dimensions(), (400, 300));
    assert!(frame.watermark_bounds.is_some());
}

/// Mean absolute per-channel difference of two equally sized images inside `rect`.
fn mean_difference(a: &RgbaImage, b: &RgbaImage, rect: &Rect) -> f64 {
    assert_eq!(a.dimensions(), b.dimensions());
    let x0 = rect.x.max(0.0).floor() as u32;
    let y0 = rect.y.max(0.0).floor() as u32;
    let x1 = ((rect.x + rect.width).ceil() as u32).min(a.width());
    let y1 = ((rect.y + rect.height).ceil() as u32).min(a.height());

    let mut total = 0u64;
    let mut samples = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            let (pa, pb) = (a.get_pixel(x, y), b.get_pixel(x, y));
            for c in 0..4 {
                total += (pa[c] as i32 - pb[c] as i32).unsigned_abs() as u64;
                samples += 1;
            }
        }
    }
    assert!(samples > 0, "empty comparison region");
    total as f64 / samples as f64
}

/// Render `config` through the preview and through a full-resolution export
/// downsampled to the preview size; return (preview vs export, preview vs base).
fn preview_export_difference(config: &WatermarkConfig) -> (f64, f64) {
    let ctx = RenderContext::new();
    let source = RgbaImage::from_pixel(2000, 1000, BASE_COLOR);

    let preview = PreviewSource::new(source.clone(), 500).unwrap();
    let frame = preview.render(config, &ctx).unwrap();
    let bounds = frame.watermark_bounds.expect("watermark drawn");

    let mut exported = source;
    ctx.render_watermark(&mut exported, config, 1.0).unwrap();
    let (w, h) = frame.image.dimensions();
    let downsampled = resample(&exported, w, h).unwrap();
    let base = RgbaImage::from_pixel(w, h, BASE_COLOR);

    (
        mean_difference(&frame.image, &downsampled, &bounds),
        mean_difference(&frame.image, &base, &bounds),
    )
}

/// Test: Preview pixels of a rotated text watermark match the export
#[test]
fn test_preview_pixels_match_export_for_text() {
    let mut text = TextWatermark::new("PROOF");
    text.font_size = 160.0;
    text.stroke.enabled = true;
    let config = WatermarkConfig::text(text)
        .with_rotation(-25.0)
        .with_opacity(0.9);

    let (difference, signal) = preview_export_difference(&config);
    assert!(signal > 5.0, "watermark barely visible: {}", signal);
    assert!(difference < 12.0, "preview differs from export by {}", difference);
}

/// Test: Preview pixels of a rotated image watermark match the export
#[test]
fn test_preview_pixels_match_export_for_image() {
    let temp = TempDir::new().unwrap();
    let logo = temp.path().join("logo.png");
    RgbaImage::from_fn(400, 200, |x, _| {
        if x < 200 {
            Rgba([250, 220, 30, 255])
        } else {
            Rgba([230, 30, 200, 255])
        }
    })
    .save(&logo)
    .unwrap();

    let mut overlay = ImageWatermark::new(&logo);
    overlay.size = OverlaySize::RelativeWidth(0.3);
    let config = WatermarkConfig::image(overlay)
        .with_rotation(30.0)
        .with_opacity(0.8);

    let (difference, signal) = preview_export_difference(&config);
    assert!(signal > 20.0, "watermark barely visible: {}", signal);
    assert!(difference < 8.0, "preview differs from export by {}", difference);
}
