// Command-line entry point. The batch machinery lives in the library crate.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use image_batch_lib::core::{JpegPreset, LogReporter, OutputTarget, build_descriptors};
use image_batch_lib::processing::{BatchConfig, BatchProcessor, image_executor};
use image_batch_lib::report::SummaryReport;
use image_batch_lib::utils::{OutputFormat, discover_inputs, ensure_dir};
use image_batch_lib::worker::{CancellationFlag, Cancellable};

#[derive(Parser)]
#[command(name = "image-batch", version, about = "Convert a directory of images with bounded concurrency")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every matching image in INPUT_DIR into OUTPUT_DIR
    Convert(ConvertArgs),
    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Args)]
struct ConvertArgs {
    input_dir: PathBuf,
    output_dir: PathBuf,

    /// Comma-separated output formats (jpeg, png, tiff, ppm, webp, thumbnail)
    #[arg(long, value_delimiter = ',')]
    formats: Vec<OutputFormat>,

    /// Maximum number of images processed at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// JPEG preset; replaces --formats and any configured resize
    #[arg(long)]
    preset: Option<JpegPreset>,

    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the batch summary as JSON to this file
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Exit non-zero when any image fails
    #[arg(long)]
    fail_on_error: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(args: &ConvertArgs) -> Result<BatchConfig> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::load(path)?,
        None => BatchConfig::default(),
    };

    if let Some(limit) = args.concurrency {
        config.concurrency = limit;
    }
    if !args.formats.is_empty() {
        config.outputs = args.formats.iter().copied().map(OutputTarget::from).collect();
    }
    if args.preset.is_some() {
        config.jpeg_preset = args.preset;
    }
    Ok(config)
}

async fn convert(args: ConvertArgs) -> Result<ExitCode> {
    let config = load_config(&args)?;

    let inputs = discover_inputs(&args.input_dir, &config.extensions).await?;
    if inputs.is_empty() {
        bail!(
            "No files matching [{}] found in {}",
            config.extensions.join(", "),
            args.input_dir.display()
        );
    }
    ensure_dir(&args.output_dir).await?;

    let descriptors = build_descriptors(&inputs, &args.output_dir, &config.job_options());
    info!(
        "Converting {} files from {} into {}",
        descriptors.len(),
        args.input_dir.display(),
        args.output_dir.display()
    );

    let cancel = CancellationFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing running jobs and skipping the rest");
            on_signal.cancel();
        }
    });

    let processor = BatchProcessor::builder()
        .concurrency(config.concurrency)
        .executor(Cancellable::new(image_executor(), cancel))
        .shared_reporter(Arc::new(LogReporter))
        .flush_timeout(config.progress_flush_timeout())
        .build()?;

    let summary = processor.process_batch(descriptors).await?;
    eprintln!("{}", SummaryReport::new(&summary).with_concurrency(config.concurrency));

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        debug!("Wrote JSON report to {}", path.display());
    }

    if args.fail_on_error && summary.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Convert(args) => convert(args).await,
        Command::DefaultConfig => BatchConfig::default()
            .to_toml()
            .map(|toml| {
                print!("{toml}");
                ExitCode::SUCCESS
            })
            .map_err(Into::into),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("image-batch error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
