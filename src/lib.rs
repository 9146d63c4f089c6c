// Watermarker library
//
// Rendering core in `watermark`, batch output in `export`, persistence in
// `store`. The binary in main.rs is a thin front end over these.

pub mod config;
pub mod constants;
pub mod export;
pub mod logging;
pub mod source;
pub mod store;
pub mod watermark;

pub use config::AppConfig;
pub use export::{export_batch, CancelFlag, ExportEvent, ExportSettings, ExportSummary};
pub use watermark::{RenderContext, WatermarkConfig, WatermarkError};
