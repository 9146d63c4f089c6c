//! Export module: batch rendering of watermarked images to disk.
//!
//! [`export_batch`] runs synchronously on the caller's thread;
//! [`ExportWorker`] runs the same pipeline on a background thread with a job
//! queue. Both render through the shared [`RenderContext`], so the output
//! matches what the preview shows.
//!
//! [`RenderContext`]: crate::watermark::RenderContext

pub mod encoder;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod resize;
pub mod settings;
pub mod worker;

pub use encoder::{EncoderFactory, ImageEncoder, JpegEncoder, PngEncoder};
pub use error::{ExportError, FailureKind};
pub use naming::{avoid_collision, guard_overwrite, output_file_name, planned_output_path};
pub use pipeline::{
    export_batch, export_one, CancelFlag, ExportEvent, ExportFailure, ExportOutcome, ExportSummary,
};
pub use resize::{resize_image, target_dimensions};
pub use settings::{ExportSettings, NamingRule, OutputFormat, ResizeSpec};
pub use worker::{ExportJob, ExportWorker, JobHandle, WorkerError};
