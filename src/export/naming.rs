//! Output naming and the overwrite guard
//!
//! The output name is derived from the source stem by the naming rule, with
//! the extension of the output format. The guard keeps exports out of the
//! source folder unless explicitly allowed, and collision avoidance makes
//! sure an existing file (the source included) is never replaced.

use std::path::{Path, PathBuf};

use super::error::ExportError;
use super::settings::{ExportSettings, NamingRule, OutputFormat};

/// Output file name for a source under the given rule.
///
/// A source without a usable stem is named `image`.
pub fn output_file_name(source: &Path, naming: &NamingRule, format: OutputFormat) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "image".to_string());

    let stem = match naming {
        NamingRule::KeepOriginal => stem,
        NamingRule::Prefix(prefix) => format!("{}{}", prefix, stem),
        NamingRule::Suffix(suffix) => format!("{}{}", stem, suffix),
    };

    format!("{}.{}", stem, format.extension())
}

/// Folder a source is exported into.
pub fn output_directory(source: &Path, settings: &ExportSettings) -> PathBuf {
    match &settings.output_dir {
        Some(dir) => dir.clone(),
        None => source_directory(source),
    }
}

/// Planned output path before collision avoidance.
pub fn planned_output_path(source: &Path, settings: &ExportSettings) -> PathBuf {
    output_directory(source, settings).join(output_file_name(
        source,
        &settings.naming,
        settings.format,
    ))
}

/// Rejects an output path that equals the source or sits in its folder.
///
/// Only the output's own folder is compared. A subfolder of the source
/// folder (`photos/out`) is a separate output directory and is accepted.
///
/// Runs before the source is opened. Folders are compared canonicalized
/// when they exist.
pub fn guard_overwrite(
    source: &Path,
    output: &Path,
    settings: &ExportSettings,
) -> Result<(), ExportError> {
    if settings.allow_source_dir {
        return Ok(());
    }

    let output_dir = output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let same_file = normalize(output) == normalize(source);
    let same_dir = normalize(&non_empty(output_dir)) == normalize(&source_directory(source));

    if same_file || same_dir {
        return Err(ExportError::OverwriteRejected {
            input: source.to_path_buf(),
            output: output.to_path_buf(),
        });
    }

    Ok(())
}

/// First free path among `name.ext`, `name_1.ext`, `name_2.ext`, ...
pub fn avoid_collision(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1u32;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn source_directory(source: &Path) -> PathBuf {
    non_empty(
        source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    )
}

fn non_empty(dir: PathBuf) -> PathBuf {
    if dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir
    }
}

/// Canonical form when the path exists, otherwise absolute against cwd.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
