// Export pipeline scenarios over real files

use super::test_harness::*;
use image::{Rgba, RgbaImage};
use std::fs;
use tempfile::TempDir;
use watermarker::export::{
    export_batch, CancelFlag, ExportSettings, FailureKind, NamingRule, OutputFormat, ResizeSpec,
};
use watermarker::watermark::{
    Anchor, ImageWatermark, OverlaySize, RenderContext, TextWatermark, WatermarkConfig,
};

fn sample_config() -> WatermarkConfig {
    let mut text = TextWatermark::new("SAMPLE");
    text.font_size = 64.0;
    WatermarkConfig::text(text)
        .with_anchor(Anchor::BottomRight)
        .with_opacity(0.5)
}

fn run(
    sources: &[std::path::PathBuf],
    config: &WatermarkConfig,
    settings: &ExportSettings,
) -> watermarker::export::ExportSummary {
    export_batch(
        sources,
        config,
        settings,
        &RenderContext::new(),
        &CancelFlag::new(),
        |_| {},
    )
}

/// Test: Resizing after compositing keeps the watermark's relative geometry
///
/// The same bottom-right "SAMPLE" watermark exported at 100% and at 200%
/// must cover the same fraction of the image.
#[test]
fn test_resize_preserves_relative_position_and_size() {
    let temp = TempDir::new().unwrap();
    let source = write_png(temp.path(), "base.png", 1000, 800);
    let config = sample_config();

    let plain = ExportSettings::default().with_output_dir(temp.path().join("plain"));
    let doubled = ExportSettings::default()
        .with_output_dir(temp.path().join("doubled"))
        .with_resize(ResizeSpec::Percent(200.0));

    let a = run(&[source.clone()], &config, &plain);
    let b = run(&[source], &config, &doubled);
    assert_eq!(a.exported_count(), 1);
    assert_eq!(b.exported_count(), 1);

    let small = image::open(&a.exported[0].output).unwrap().to_rgba8();
    let large = image::open(&b.exported[0].output).unwrap().to_rgba8();
    assert_eq!(small.dimensions(), (1000, 800));
    assert_eq!(large.dimensions(), (2000, 1600));

    let small_box = normalized_bbox(&small, 24).expect("watermark visible");
    let large_box = normalized_bbox(&large, 24).expect("watermark visible");
    for (s, l) in small_box.iter().zip(large_box.iter()) {
        assert!((s - l).abs() < 0.01, "{:?} vs {:?}", small_box, large_box);
    }

    // Bottom-right anchor keeps the watermark in the lower right quadrant
    assert!(small_box[0] > 0.5 && small_box[1] > 0.5);
    assert!(small_box[2] < 1.0 && small_box[3] < 1.0);
}

/// Test: Exporting into the source folder without override writes nothing
#[test]
fn test_output_dir_equal_to_source_dir_is_rejected() {
    let temp = TempDir::new().unwrap();
    let sources = write_pngs(temp.path(), 3, 64, 64);
    let before = file_count(temp.path());

    let settings = ExportSettings::default().with_output_dir(temp.path());
    let summary = run(&sources, &sample_config(), &settings);

    assert_eq!(summary.exported_count(), 0);
    assert_eq!(summary.failed_count(), 3);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.kind() == FailureKind::OverwriteRejected));
    assert_eq!(file_count(temp.path()), before);
}

/// Test: Explicit override writes next to the source without touching it
#[test]
fn test_allow_source_dir_never_clobbers_source() {
    let temp = TempDir::new().unwrap();
    let source = write_png(temp.path(), "photo.png", 64, 64);
    let original = fs::read(&source).unwrap();

    let settings = ExportSettings {
        allow_source_dir: true,
        naming: NamingRule::KeepOriginal,
        ..ExportSettings::default()
    };
    let summary = run(&[source.clone()], &sample_config(), &settings);

    assert_eq!(summary.exported_count(), 1);
    assert_eq!(summary.exported[0].output, temp.path().join("photo_1.png"));
    assert_eq!(fs::read(&source).unwrap(), original);
}

/// Test: One corrupt file in a batch fails alone
#[test]
fn test_batch_with_one_corrupt_file() {
    let temp = TempDir::new().unwrap();
    let mut sources = write_pngs(temp.path(), 4, 80, 60);
    sources.insert(2, write_corrupt(temp.path(), "broken.png"));

    let settings = ExportSettings::default().with_output_dir(temp.path().join("out"));
    let summary = run(&sources, &sample_config(), &settings);

    assert_eq!(summary.exported_count(), 4);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.failures[0].kind(), FailureKind::AssetLoad);
    assert_eq!(summary.failures[0].source, sources[2]);
    assert!(!summary.cancelled);
    assert_eq!(file_count(&temp.path().join("out")), 4);
}

/// Test: Zero opacity leaves the image pixel-identical
#[test]
fn test_zero_opacity_is_identity() {
    let temp = TempDir::new().unwrap();
    let source = write_png(temp.path(), "base.png", 300, 200);
    let config = sample_config().with_opacity(0.0);

    let settings = ExportSettings::default().with_output_dir(temp.path().join("out"));
    let summary = run(&[source.clone()], &config, &settings);

    let input = image::open(&source).unwrap().to_rgba8();
    let output = image::open(&summary.exported[0].output).unwrap().to_rgba8();
    assert_eq!(input.as_raw(), output.as_raw());
}

/// Test: Same inputs give byte-identical files
#[test]
fn test_export_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let source = write_png(temp.path(), "base.png", 400, 300);
    let config = sample_config().with_rotation(-30.0);

    let first = run(
        &[source.clone()],
        &config,
        &ExportSettings::default().with_output_dir(temp.path().join("a")),
    );
    let second = run(
        &[source],
        &config,
        &ExportSettings::default().with_output_dir(temp.path().join("b")),
    );

    let a = fs::read(&first.exported[0].output).unwrap();
    let b = fs::read(&second.exported[0].output).unwrap();
    assert_eq!(a, b);
}

/// Test: Transparent overlay regions leave the base untouched
#[test]
fn test_transparent_overlay_region_preserves_base() {
    let temp = TempDir::new().unwrap();

    // Left half fully transparent, right half opaque red
    let overlay = RgbaImage::from_fn(40, 20, |x, _| {
        if x < 20 {
            Rgba([255, 0, 0, 0])
        } else {
            Rgba([255, 0, 0, 255])
        }
    });
    let overlay_path = temp.path().join("logo.png");
    overlay.save(&overlay_path).unwrap();

    let mut image_mark = ImageWatermark::new(&overlay_path);
    image_mark.size = OverlaySize::Factor(1.0);
    let config = WatermarkConfig::image(image_mark)
        .with_anchor(Anchor::Center)
        .with_opacity(1.0);

    let mut base = RgbaImage::from_pixel(100, 60, BASE_COLOR);
    let placement = RenderContext::new()
        .render_watermark(&mut base, &config, 1.0)
        .unwrap()
        .unwrap();
    assert_eq!((placement.x, placement.y), (30.0, 20.0));

    for y in 20..40 {
        for x in 30..50 {
            assert_eq!(*base.get_pixel(x, y), BASE_COLOR, "pixel {},{}", x, y);
        }
        for x in 50..70 {
            assert_eq!(*base.get_pixel(x, y), Rgba([255, 0, 0, 255]));
        }
    }
}

/// Test: JPEG output flattens onto the configured background
#[test]
fn test_jpeg_export_of_transparent_source() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("clear.png");
    RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 0]))
        .save(&source)
        .unwrap();

    let settings = ExportSettings::default()
        .with_output_dir(temp.path().join("out"))
        .with_format(OutputFormat::Jpeg);
    let config = WatermarkConfig::text(TextWatermark::new(" ")).with_opacity(1.0);
    let summary = run(&[source], &config, &settings);

    let output = &summary.exported[0].output;
    assert_eq!(output.extension().unwrap(), "jpg");
    let decoded = image::open(output).unwrap().to_rgb8();
    let pixel = decoded.get_pixel(32, 32);
    assert!(pixel.0.iter().all(|&c| c > 245), "{:?}", pixel);
}

/// Test: Failed overlay loads are reported as asset failures per file
#[test]
fn test_missing_overlay_fails_each_file() {
    let temp = TempDir::new().unwrap();
    let sources = write_pngs(temp.path(), 2, 32, 32);
    let config = WatermarkConfig::image(ImageWatermark::new(temp.path().join("missing.png")));

    let settings = ExportSettings::default().with_output_dir(temp.path().join("out"));
    let summary = run(&sources, &config, &settings);

    assert_eq!(summary.failed_count(), 2);
    assert!(summary
        .failures
        .iter()
        .all(|f| f.kind() == FailureKind::AssetLoad));
}

/// Test: A file whose resized output would be too large fails on its own
#[test]
fn test_oversized_resize_fails_only_that_file() {
    let temp = TempDir::new().unwrap();
    let sources = vec![
        write_png(temp.path(), "small.png", 10, 10),
        write_png(temp.path(), "large.png", 200, 100),
        write_png(temp.path(), "tiny.png", 12, 12),
    ];
    let settings = ExportSettings::default()
        .with_output_dir(temp.path().join("out"))
        .with_resize(ResizeSpec::Percent(10_000.0));

    let summary = run(&sources, &sample_config(), &settings);

    assert_eq!(summary.exported_count(), 2);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.failures[0].source, sources[1]);
    assert_eq!(summary.failures[0].kind(), FailureKind::Resize);
    assert_eq!(file_count(&temp.path().join("out")), 2);
}

/// Test: Oversized overlays and font sizes are render failures, not crashes
#[test]
fn test_oversized_watermark_layers_fail_per_file() {
    let temp = TempDir::new().unwrap();
    let sources = write_pngs(temp.path(), 2, 40, 40);
    let logo = temp.path().join("logo.png");
    RgbaImage::from_pixel(20, 10, Rgba([0, 0, 255, 255]))
        .save(&logo)
        .unwrap();

    let mut overlay = ImageWatermark::new(&logo);
    overlay.size = OverlaySize::Factor(1.0e6);
    let mut text = TextWatermark::new("HUGE");
    text.font_size = 1.0e6;

    for config in [WatermarkConfig::image(overlay), WatermarkConfig::text(text)] {
        let out = temp.path().join("out");
        let settings = ExportSettings::default().with_output_dir(&out);
        let summary = run(&sources, &config, &settings);

        assert_eq!(summary.failed_count(), 2);
        assert!(summary
            .failures
            .iter()
            .all(|f| f.kind() == FailureKind::Render));
        assert_eq!(file_count(&out), 0);
    }
}
