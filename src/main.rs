use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use media_renamer::console::{Console, WarningCode};
use media_renamer::datetime::Zone;
use media_renamer::file_ops::{FileProcessor, Roots, RunSummary};
use media_renamer::options::{
    parse_bound, RenameOptions, DEFAULT_DATETIME_FORMAT, DEFAULT_EARLIEST, DEFAULT_POSTFIX_FORMAT,
};

const SEPARATOR_WIDTH: usize = 100;

#[derive(Parser)]
#[command(name = "media-renamer")]
#[command(version)]
#[command(about = "Rename image and video files after their capture datetime")]
#[command(long_about = "Renames every supported image and video file in a directory tree after the moment it was captured.

The datetime comes from EXIF (images) or the movie header (videos) and falls back to the file's modification time. Both are range checked and compared; anomalies are reported as warnings:

  STPS  source and target paths are the same
  APFX  a postfix was added to avoid a name collision
  WDOR  filesystem datetime out of range
  E404  metadata or its datetime not found
  EDOR  metadata datetime out of range
  DIFF  metadata and filesystem datetimes differ too much

Supported extensions: jpg, jpeg, png, tif, tiff, webp, heic, heif, mp4, mov, m4v, 3gp
Paths that are not given are asked for interactively.")]
struct Cli {
    /// Directory to rename files in
    source: Option<PathBuf>,

    /// Directory to move renamed files into (default: the source)
    target: Option<PathBuf>,

    /// Only process files directly inside the source directory
    #[arg(long)]
    no_recursive: bool,

    /// Remove source directories left empty after the run
    #[arg(long)]
    delete_empty: bool,

    /// Name divergent files "<metadata> (<filesystem>)"
    #[arg(long)]
    dual: bool,

    /// strftime format for the datetime part of the name
    #[arg(long, default_value = DEFAULT_DATETIME_FORMAT)]
    format: String,

    /// Postfix added on name collisions; {} is replaced by a counter from 1
    #[arg(long, default_value = DEFAULT_POSTFIX_FORMAT)]
    postfix: String,

    /// Maximum gap in seconds between metadata and filesystem datetimes
    #[arg(long, default_value_t = 10.0)]
    tolerance: f64,

    /// Datetimes before this are out of range (YYYY-MM-DD[ HH:MM:SS])
    #[arg(long, default_value = DEFAULT_EARLIEST)]
    earliest: String,

    /// Fixed UTC offset in hours for filesystem and video times (default: local zone)
    #[arg(long, allow_negative_numbers = true, value_parser = clap::value_parser!(i32).range(-23..=23))]
    utc_offset: Option<i32>,

    /// Do not print warnings with this code (repeatable)
    #[arg(long, value_name = "CODE")]
    mute: Vec<WarningCode>,

    /// Wait for Enter after every warning
    #[arg(long)]
    pause: bool,

    /// Print a separator line before every entry
    #[arg(long)]
    separate: bool,

    /// Show what would be renamed without touching anything
    #[arg(long)]
    dry_run: bool,

    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose)?;

    info!("Starting media-renamer");

    let options = build_options(&cli)?;
    let mut console = Console::stdio()
        .with_muted(cli.mute.iter().copied())
        .with_pause(cli.pause)
        .with_separator(cli.separate.then(|| "-".repeat(SEPARATOR_WIDTH)));

    let (source, target) = match cli.source {
        Some(source) => (Some(source), cli.target),
        None => {
            let source = console
                .prompt_directory("source")
                .context("Failed to read the source directory")?;
            let target = console
                .prompt_directory("target")
                .context("Failed to read the target directory")?;
            (source, target)
        }
    };

    let roots = Roots::prepare(source, target, options.dry_run)
        .context("Cannot start renaming")?;
    let dry_run = options.dry_run;

    let mut processor =
        FileProcessor::new(options, console).context("Invalid renaming options")?;
    let summary = processor.process(&roots);

    print_summary(&summary, dry_run);
    Ok(())
}

fn build_options(cli: &Cli) -> Result<RenameOptions> {
    let earliest = parse_bound(&cli.earliest)
        .with_context(|| format!("Invalid --earliest value '{}'", cli.earliest))?;
    let zone = match cli.utc_offset {
        Some(hours) => Zone::from_utc_offset_hours(hours)
            .with_context(|| format!("Invalid --utc-offset value {}", hours))?,
        None => Zone::Local,
    };

    Ok(RenameOptions {
        recursive: !cli.no_recursive,
        delete_empty: cli.delete_empty,
        dual: cli.dual,
        datetime_format: cli.format.clone(),
        postfix_format: cli.postfix.clone(),
        tolerance_secs: cli.tolerance,
        earliest,
        latest: None,
        zone,
        dry_run: cli.dry_run,
    })
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if dry_run {
        println!("\nDry run complete! Nothing was changed.");
    } else {
        println!("\nProcessing complete!");
    }
    println!("Files renamed: {}", summary.renamed);
    println!("Files already named: {}", summary.unchanged);
    println!("Entries skipped: {}", summary.skipped);
    println!("Directories created: {}", summary.directories_created);
    println!("Directories removed: {}", summary.directories_removed);
    println!("Warnings: {}", summary.warnings);
    println!("Errors: {}", summary.failed);
}
