use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use watermarker::config::AppConfig;
use watermarker::export::{
    ExportEvent, ExportSettings, ExportWorker, NamingRule, OutputFormat, ResizeSpec,
};
use watermarker::logging::{init_subscriber, LogFormat};
use watermarker::source::collect_images;
use watermarker::store::{Session, Stores};
use watermarker::watermark::{FontBook, PreviewSource, RenderContext, WatermarkConfig};

/// Watermarker - batch text and image watermarking
#[derive(Parser, Debug)]
#[command(name = "watermarker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark a batch of images
    Export(ExportArgs),
    /// Render a single preview image
    Preview(PreviewArgs),
    /// Manage saved templates
    #[command(subcommand)]
    Templates(TemplatesCommand),
}

#[derive(Args, Debug)]
struct WatermarkSource {
    /// Saved template to use
    #[arg(long, conflicts_with = "watermark")]
    template: Option<String>,

    /// Watermark definition file (YAML or JSON)
    #[arg(long)]
    watermark: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    source: WatermarkSource,

    /// Output folder
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format (png or jpeg)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// JPEG quality 1-100
    #[arg(long)]
    quality: Option<u8>,

    /// Prefix added to output names
    #[arg(long, group = "naming")]
    prefix: Option<String>,

    /// Suffix added to output names
    #[arg(long, group = "naming")]
    suffix: Option<String>,

    /// Keep the source file names
    #[arg(long, group = "naming")]
    keep_names: bool,

    /// Resize output to this width
    #[arg(long, group = "resize")]
    resize_width: Option<u32>,

    /// Resize output to this height
    #[arg(long, group = "resize")]
    resize_height: Option<u32>,

    /// Resize output by percent
    #[arg(long, group = "resize")]
    resize_percent: Option<f32>,

    /// Allow writing into a source's own folder
    #[arg(long)]
    allow_source_dir: bool,

    /// Descend into subfolders of folder arguments
    #[arg(short, long)]
    recursive: bool,

    /// Images or folders to export
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    source: WatermarkSource,

    /// Source image
    #[arg(long)]
    image: PathBuf,

    /// Longest preview edge in pixels
    #[arg(long)]
    max_edge: Option<u32>,

    /// Where to write the preview
    #[arg(long)]
    out: PathBuf,
}

#[derive(Subcommand, Debug)]
enum TemplatesCommand {
    /// List saved templates
    List,
    /// Print a template as JSON
    Show { name: String },
    /// Delete a template
    Delete { name: String },
    /// Save a watermark definition as a template
    Save {
        name: String,
        /// Watermark definition file (YAML or JSON)
        #[arg(long)]
        watermark: PathBuf,
        /// Export settings file (YAML or JSON)
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.validate()?;

    let level = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    init_subscriber(cli.log_format.unwrap_or(config.logging.format), &level)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let app_dir = config
        .app_dir()
        .context("No application directory: set storage.directory, XDG_CONFIG_HOME or HOME")?;
    let stores = Stores::in_dir(&app_dir);
    tracing::debug!(app_dir = %app_dir.display(), "Using application directory");

    match cli.command {
        Command::Export(args) => run_export(args, &config, &stores),
        Command::Preview(args) => run_preview(args, &config, &stores),
        Command::Templates(cmd) => run_templates(cmd, &stores),
    }
}

fn build_context(config: &AppConfig) -> RenderContext {
    let fonts = FontBook::new();
    for dir in &config.fonts.directories {
        match fonts.register_directory(dir) {
            Ok(count) => tracing::info!(dir = %dir.display(), fonts = count, "Registered fonts"),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Skipping font directory"),
        }
    }
    RenderContext::with_parts(fonts, config.render.overlay_cache_entries)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Apply the chosen watermark source to the session.
fn select_watermark(source: &WatermarkSource, stores: &Stores, session: &mut Session) -> Result<()> {
    if let Some(name) = &source.template {
        let template = stores.templates.load(name)?;
        session.apply_template(&template);
    } else if let Some(path) = &source.watermark {
        let watermark: WatermarkConfig = read_yaml(path)?;
        session.set_watermark(watermark);
    }
    Ok(())
}

fn export_settings(args: &ExportArgs, base: &ExportSettings) -> ExportSettings {
    let mut settings = base.clone();
    if let Some(dir) = &args.output_dir {
        settings.output_dir = Some(dir.clone());
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(quality) = args.quality {
        settings.jpeg_quality = quality;
    }
    if let Some(prefix) = &args.prefix {
        settings.naming = NamingRule::Prefix(prefix.clone());
    } else if let Some(suffix) = &args.suffix {
        settings.naming = NamingRule::Suffix(suffix.clone());
    } else if args.keep_names {
        settings.naming = NamingRule::KeepOriginal;
    }
    if let Some(width) = args.resize_width {
        settings.resize = Some(ResizeSpec::Width(width));
    } else if let Some(height) = args.resize_height {
        settings.resize = Some(ResizeSpec::Height(height));
    } else if let Some(percent) = args.resize_percent {
        settings.resize = Some(ResizeSpec::Percent(percent));
    }
    if args.allow_source_dir {
        settings.allow_source_dir = true;
    }
    settings
}

fn run_export(args: ExportArgs, config: &AppConfig, stores: &Stores) -> Result<ExitCode> {
    let mut session = Session::open(stores.session.clone());
    select_watermark(&args.source, stores, &mut session)?;

    let settings = export_settings(&args, session.export());
    if let Err(e) = settings.validate() {
        bail!("Invalid export settings: {}", e);
    }
    session.set_export(settings.clone());

    let sources = collect_images(&args.paths, args.recursive);
    if sources.is_empty() {
        bail!("No supported images found");
    }

    let worker = ExportWorker::spawn(Arc::new(build_context(config)))?;
    let job = worker.submit(sources, session.watermark(), &settings)?;

    let mut exit = ExitCode::from(2);
    let mut finished = false;
    for event in job.events() {
        match event {
            ExportEvent::Started { total } => println!("Exporting {} image(s)", total),
            ExportEvent::FileExported { input, output, .. } => {
                println!("  ok    {} -> {}", input.display(), output.display())
            }
            ExportEvent::FileFailed {
                input,
                kind,
                message,
                ..
            } => println!("  fail  {} [{}] {}", input.display(), kind, message),
            ExportEvent::Finished {
                exported,
                failed,
                cancelled,
            } => {
                println!(
                    "Done: {} exported, {} failed{}",
                    exported,
                    failed,
                    if cancelled { " (cancelled)" } else { "" }
                );
                finished = true;
                if failed == 0 && !cancelled {
                    exit = ExitCode::SUCCESS;
                }
            }
            ExportEvent::Aborted { message } => println!("Aborted: {}", message),
        }
    }
    worker.shutdown();
    if !finished {
        eprintln!("Export did not complete");
    }

    session.close()?;
    Ok(exit)
}

fn run_preview(args: PreviewArgs, config: &AppConfig, stores: &Stores) -> Result<ExitCode> {
    let mut session = Session::open(stores.session.clone());
    select_watermark(&args.source, stores, &mut session)?;

    let max_edge = args.max_edge.unwrap_or(config.preview.max_edge);
    let preview = PreviewSource::open(&args.image, max_edge)?;
    let ctx = build_context(config);
    let frame = preview.render(session.watermark(), &ctx)?;

    frame
        .image
        .save(&args.out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    let (width, height) = preview.preview_size();
    println!(
        "Wrote {} ({}x{}, scale {:.3})",
        args.out.display(),
        width,
        height,
        frame.scale
    );
    if let Some(bounds) = frame.watermark_bounds {
        println!(
            "Watermark at x={:.1} y={:.1} w={:.1} h={:.1}",
            bounds.x, bounds.y, bounds.width, bounds.height
        );
    }

    session.close()?;
    Ok(ExitCode::SUCCESS)
}

fn run_templates(cmd: TemplatesCommand, stores: &Stores) -> Result<ExitCode> {
    match cmd {
        TemplatesCommand::List => {
            for name in stores.templates.list()? {
                println!("{}", name);
            }
        }
        TemplatesCommand::Show { name } => {
            let template = stores.templates.load(&name)?;
            println!("{}", serde_json::to_string_pretty(&template)?);
        }
        TemplatesCommand::Delete { name } => {
            stores.templates.delete(&name)?;
            println!("Deleted {}", name);
        }
        TemplatesCommand::Save {
            name,
            watermark,
            export,
        } => {
            let watermark: WatermarkConfig = read_yaml(&watermark)?;
            if let Err(e) = watermark.validate() {
                bail!("Invalid watermark: {}", e);
            }
            let export: Option<ExportSettings> = export
                .as_deref()
                .map(read_yaml::<ExportSettings>)
                .transpose()?;
            let template = stores.templates.save(&name, &watermark, export.as_ref())?;
            println!("Saved {}", template.name);
        }
    }
    Ok(ExitCode::SUCCESS)
}
