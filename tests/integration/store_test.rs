// Template and session persistence on disk

use std::fs;
use tempfile::TempDir;
use watermarker::export::{ExportSettings, NamingRule, OutputFormat, ResizeSpec};
use watermarker::store::{Session, SessionState, StoreError, Stores};
use watermarker::watermark::{
    Anchor, Color, ImageWatermark, OverlaySize, Placement, ShadowStyle, StrokeStyle,
    TextWatermark, WatermarkConfig, WatermarkContent,
};

fn every_text_field() -> WatermarkConfig {
    let text = TextWatermark {
        text: "Line one\nLine two".to_string(),
        font_family: "DejaVu Sans".to_string(),
        font_size: 27.75,
        bold: true,
        italic: false,
        color: Color::rgba(250, 200, 10, 180),
        shadow: ShadowStyle {
            enabled: true,
            color: Color::rgba(0, 0, 40, 90),
            offset_x: 4,
            offset_y: -2,
            blur_radius: 2.5,
        },
        stroke: StrokeStyle {
            enabled: true,
            color: Color::rgb(10, 10, 10),
            width: 1.5,
        },
    };
    WatermarkConfig::text(text)
        .with_placement(Placement::Free { x: 0.3, y: 0.65 })
        .with_rotation(12.5)
        .with_opacity(0.42)
}

/// Test: Saving then loading a template reproduces every field
#[test]
fn test_template_round_trip_all_fields() {
    let temp = TempDir::new().unwrap();
    let stores = Stores::in_dir(temp.path());

    let export = ExportSettings {
        format: OutputFormat::Jpeg,
        jpeg_quality: 77,
        output_dir: Some(temp.path().join("exports")),
        allow_source_dir: true,
        naming: NamingRule::Suffix("_final".to_string()),
        resize: Some(ResizeSpec::Height(720)),
        background: Color::rgb(1, 2, 3),
    };

    stores
        .templates
        .save("Client Proofs", &every_text_field(), Some(&export))
        .unwrap();

    assert_eq!(stores.templates.list().unwrap(), vec!["Client_Proofs"]);
    let loaded = stores.templates.load("Client Proofs").unwrap();
    assert_eq!(loaded.watermark, every_text_field());
    assert_eq!(loaded.export, Some(export));

    // Files are human-readable JSON
    let raw = fs::read_to_string(temp.path().join("templates").join("Client_Proofs.json")).unwrap();
    assert!(raw.contains("\n  \"watermark\""));
    assert!(raw.contains("\"type\": \"text\""));
}

/// Test: Image templates keep the overlay path and size rule
#[test]
fn test_image_template_round_trip() {
    let temp = TempDir::new().unwrap();
    let stores = Stores::in_dir(temp.path());

    for size in [
        OverlaySize::RelativeWidth(0.3),
        OverlaySize::Factor(0.5),
        OverlaySize::Width(256),
        OverlaySize::Height(64),
    ] {
        let mut overlay = ImageWatermark::new("/assets/logo.png");
        overlay.size = size;
        let config = WatermarkConfig::image(overlay).with_anchor(Anchor::BottomLeft);

        stores.templates.save("logo", &config, None).unwrap();
        let loaded = stores.templates.load("logo").unwrap();
        assert_eq!(loaded.watermark, config);
        assert!(matches!(loaded.watermark.content, WatermarkContent::Image(_)));
    }
}

/// Test: Template removal and lookup errors
#[test]
fn test_template_delete_and_errors() {
    let temp = TempDir::new().unwrap();
    let stores = Stores::in_dir(temp.path());
    stores
        .templates
        .save("temp", &WatermarkConfig::default(), None)
        .unwrap();

    stores.templates.delete("temp").unwrap();
    assert!(stores.templates.list().unwrap().is_empty());
    assert!(matches!(
        stores.templates.load("temp"),
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        stores.templates.save(" ", &WatermarkConfig::default(), None),
        Err(StoreError::InvalidName(_))
    ));
}

/// Test: A corrupt session file falls back to defaults
#[test]
fn test_corrupt_session_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let stores = Stores::in_dir(temp.path());
    fs::write(temp.path().join("session.json"), "\u{0}garbage").unwrap();

    let session = Session::open(stores.session.clone());
    assert_eq!(session.snapshot(), SessionState::default());
}

/// Test: Session state survives close and reopen
#[test]
fn test_session_restore_after_close() {
    let temp = TempDir::new().unwrap();
    let stores = Stores::in_dir(temp.path());

    let mut session = Session::open(stores.session.clone());
    session.set_watermark(every_text_field());
    session.set_export(ExportSettings::default().with_naming(NamingRule::KeepOriginal));
    session.close().unwrap();

    let restored = Session::open(stores.session.clone());
    assert_eq!(restored.watermark(), &every_text_field());
    assert_eq!(restored.export().naming, NamingRule::KeepOriginal);
}

/// Test: Applying a template goes through the session
#[test]
fn test_apply_template_to_session() {
    let temp = TempDir::new().unwrap();
    let stores = Stores::in_dir(temp.path());
    let export = ExportSettings::default().with_format(OutputFormat::Jpeg);
    stores
        .templates
        .save("jpeg", &every_text_field(), Some(&export))
        .unwrap();

    let mut session = Session::open(stores.session.clone());
    session.apply_template(&stores.templates.load("jpeg").unwrap());
    assert_eq!(session.watermark(), &every_text_field());
    assert_eq!(session.export(), &export);
}
