//! Batch export pipeline
//!
//! Each source goes through: overwrite guard, load (EXIF oriented), render
//! and composite at source resolution, optional resize, encode, write. A
//! failing file is recorded and skipped; the batch keeps going. A
//! [`CancelFlag`] is checked between files.

use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::encoder::{EncoderFactory, ImageEncoder};
use super::error::{ExportError, FailureKind};
use super::naming::{avoid_collision, guard_overwrite, planned_output_path};
use super::resize::resize_image;
use super::settings::ExportSettings;
use crate::source::load_source;
use crate::watermark::{RenderContext, WatermarkConfig};

/// Cooperative cancellation flag shared between a job and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress events emitted while a batch runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExportEvent {
    Started {
        total: usize,
    },
    FileExported {
        index: usize,
        input: PathBuf,
        output: PathBuf,
    },
    FileFailed {
        index: usize,
        input: PathBuf,
        kind: FailureKind,
        message: String,
    },
    Finished {
        exported: usize,
        failed: usize,
        cancelled: bool,
    },
    /// The job stopped without finishing; emitted by the worker instead of `Finished`.
    Aborted {
        message: String,
    },
}

/// A successfully written file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// A file that could not be exported
#[derive(Debug)]
pub struct ExportFailure {
    pub source: PathBuf,
    pub error: ExportError,
}

impl ExportFailure {
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

/// Result of a whole batch
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub exported: Vec<ExportOutcome>,
    pub failures: Vec<ExportFailure>,
    pub cancelled: bool,
}

impl ExportSummary {
    pub fn exported_count(&self) -> usize {
        self.exported.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// True when every file was exported and the batch was not cancelled.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Export a single source and return the path written.
pub fn export_one(
    source: &Path,
    config: &WatermarkConfig,
    settings: &ExportSettings,
    ctx: &RenderContext,
    encoder: &dyn ImageEncoder,
) -> Result<PathBuf, ExportError> {
    let planned = planned_output_path(source, settings);
    guard_overwrite(source, &planned, settings)?;

    let mut image = load_source(source)
        .map_err(ExportError::source_load)?
        .to_rgba8();

    ctx.render_watermark(&mut image, config, 1.0)?;

    if let Some(spec) = settings.resize {
        image = resize_image(&image, spec)?;
    }

    let data = encoder.encode(&image)?;

    if let Some(dir) = planned.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;
    }

    write_new_file(&planned, &data)
}

/// Write to the first free name; never replaces an existing file.
fn write_new_file(planned: &Path, data: &[u8]) -> Result<PathBuf, ExportError> {
    create_and_write(planned, |file| file.write_all(data))
}

/// Create the first free name for `planned` and fill it with `write`.
///
/// A file whose write fails is removed again, so no truncated output is
/// left behind to push the next attempt to a `_1` name.
fn create_and_write<W>(planned: &Path, mut write: W) -> Result<PathBuf, ExportError>
where
    W: FnMut(&mut File) -> std::io::Result<()>,
{
    loop {
        let target = avoid_collision(planned);
        match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(mut file) => {
                if let Err(e) = write(&mut file) {
                    drop(file);
                    if let Err(cleanup) = fs::remove_file(&target) {
                        warn!(
                            output = %target.display(),
                            error = %cleanup,
                            "Failed to remove partial output"
                        );
                    }
                    return Err(ExportError::io(&target, e));
                }
                return Ok(target);
            }
            // Taken between the existence check and the open
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(ExportError::io(&target, e)),
        }
    }
}

/// Export every source, reporting progress through `on_event`.
///
/// Per-file failures are collected in the summary. Cancellation is observed
/// before each file; files already written stay on disk.
pub fn export_batch<F>(
    sources: &[PathBuf],
    config: &WatermarkConfig,
    settings: &ExportSettings,
    ctx: &RenderContext,
    cancel: &CancelFlag,
    mut on_event: F,
) -> ExportSummary
where
    F: FnMut(ExportEvent),
{
    let start = Instant::now();
    let mut summary = ExportSummary::default();
    on_event(ExportEvent::Started {
        total: sources.len(),
    });
    info!(
        total = sources.len(),
        format = settings.format.as_str(),
        "Starting export"
    );

    let settings_error = settings.validate().err();
    let encoder = EncoderFactory::create(settings);

    for (index, source) in sources.iter().enumerate() {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            info!(remaining = sources.len() - index, "Export cancelled");
            break;
        }

        let file_start = Instant::now();
        let result = match &settings_error {
            Some(message) => Err(ExportError::InvalidSettings(message.clone())),
            None => export_one(source, config, settings, ctx, encoder.as_ref()),
        };

        match result {
            Ok(output) => {
                debug!(
                    path = %source.display(),
                    output = %output.display(),
                    elapsed_ms = file_start.elapsed().as_millis() as u64,
                    "Exported file"
                );
                on_event(ExportEvent::FileExported {
                    index,
                    input: source.clone(),
                    output: output.clone(),
                });
                summary.exported.push(ExportOutcome {
                    input: source.clone(),
                    output,
                });
            }
            Err(error) => {
                warn!(
                    path = %source.display(),
                    kind = %error.kind(),
                    error = %error,
                    "Export failed"
                );
                on_event(ExportEvent::FileFailed {
                    index,
                    input: source.clone(),
                    kind: error.kind(),
                    message: error.to_string(),
                });
                summary.failures.push(ExportFailure {
                    source: source.clone(),
                    error,
                });
            }
        }
    }

    info!(
        exported = summary.exported_count(),
        failed = summary.failed_count(),
        cancelled = summary.cancelled,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Export finished"
    );
    on_event(ExportEvent::Finished {
        exported: summary.exported_count(),
        failed: summary.failed_count(),
        cancelled: summary.cancelled,
    });

    summary
}
