// Command-line front end

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use super::test_harness::{file_count, write_corrupt, write_png, write_pngs};

const WATERMARK_YAML: &str = r#"
content:
  type: text
  text: "CLI"
  font_size: 24
placement:
  anchor: bottom-right
opacity: 0.6
"#;

struct Fixture {
    temp: TempDir,
    config: PathBuf,
    watermark: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.yaml");
        fs::write(
            &config,
            format!(
                "storage:\n  directory: {}\n",
                temp.path().join("app").display()
            ),
        )
        .unwrap();
        let watermark = temp.path().join("mark.yaml");
        fs::write(&watermark, WATERMARK_YAML).unwrap();
        Self {
            temp,
            config,
            watermark,
        }
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_watermarker"))
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Test: Exporting a folder writes one file per image and exits cleanly
#[test]
fn test_cli_export_folder() {
    let fx = Fixture::new();
    let photos = fx.path().join("photos");
    fs::create_dir(&photos).unwrap();
    write_pngs(&photos, 2, 120, 80);
    let out = fx.path().join("out");

    let output = fx.run(&[
        "export",
        "--watermark",
        fx.watermark.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "--format",
        "jpeg",
        photos.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("Done: 2 exported, 0 failed"));
    assert!(out.join("img0_watermarked.jpg").is_file());
    assert!(out.join("img1_watermarked.jpg").is_file());

    // The session remembers the watermark and settings
    assert!(fx.path().join("app").join("session.json").is_file());
}

/// Test: Any failed file gives a non-zero exit status
#[test]
fn test_cli_export_reports_failures() {
    let fx = Fixture::new();
    let good = write_png(fx.path(), "good.png", 50, 50);
    let bad = write_corrupt(fx.path(), "bad.png");
    let out = fx.path().join("out");

    let output = fx.run(&[
        "export",
        "--watermark",
        fx.watermark.to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        good.to_str().unwrap(),
        bad.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[asset_load]"), "{}", text);
    assert!(text.contains("Done: 1 exported, 1 failed"), "{}", text);
    assert_eq!(file_count(&out), 1);
}

/// Test: Without an output folder or override, nothing is written
#[test]
fn test_cli_refuses_source_folder() {
    let fx = Fixture::new();
    let photos = fx.path().join("photos");
    fs::create_dir(&photos).unwrap();
    write_pngs(&photos, 2, 30, 30);

    let output = fx.run(&[
        "export",
        "--watermark",
        fx.watermark.to_str().unwrap(),
        photos.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("[overwrite_rejected]"));
    assert_eq!(file_count(&photos), 2);
}

/// Test: Templates can be saved, listed, shown and used for export
#[test]
fn test_cli_templates_workflow() {
    let fx = Fixture::new();

    let saved = fx.run(&[
        "templates",
        "save",
        "My Mark",
        "--watermark",
        fx.watermark.to_str().unwrap(),
    ]);
    assert!(saved.status.success());

    let listed = fx.run(&["templates", "list"]);
    assert_eq!(stdout(&listed).trim(), "My_Mark");

    let shown = fx.run(&["templates", "show", "My Mark"]);
    assert!(stdout(&shown).contains("\"text\": \"CLI\""));

    let source = write_png(fx.path(), "photo.png", 64, 64);
    let out = fx.path().join("out");
    let exported = fx.run(&[
        "export",
        "--template",
        "My Mark",
        "--output-dir",
        out.to_str().unwrap(),
        "--keep-names",
        source.to_str().unwrap(),
    ]);
    assert!(exported.status.success());
    assert!(out.join("photo.png").is_file());

    let deleted = fx.run(&["templates", "delete", "My Mark"]);
    assert!(deleted.status.success());
    assert!(stdout(&fx.run(&["templates", "list"])).trim().is_empty());
}

/// Test: Preview writes a downsampled image
#[test]
fn test_cli_preview() {
    let fx = Fixture::new();
    let source = write_png(fx.path(), "big.png", 1200, 600);
    let out = fx.path().join("preview.png");

    let output = fx.run(&[
        "preview",
        "--image",
        source.to_str().unwrap(),
        "--watermark",
        fx.watermark.to_str().unwrap(),
        "--max-edge",
        "300",
        "--out",
        out.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "{}", stdout(&output));
    let preview = image::open(&out).unwrap().to_rgba8();
    assert_eq!(preview.dimensions(), (300, 150));
}

/// Test: Loading an unknown template is an error
#[test]
fn test_cli_unknown_template() {
    let fx = Fixture::new();
    let output = fx.run(&["templates", "show", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Template not found"));
}
