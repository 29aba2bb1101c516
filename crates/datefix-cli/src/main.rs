use std::path::PathBuf;

use clap::Parser;
use datefix_core::error::ConfigError;
use datefix_core::fsops::walk::Recursion;
use datefix_core::{FileOutcome, ProcessOptions, Tz};
use log::{debug, error, info, warn, LevelFilter};

#[derive(Parser)]
#[command(name = "datefix", version, about = "Standardise photo and video file names and timestamps")]
struct Cli {
    /// The directory to start in
    #[arg(value_parser = parse_directory)]
    path: PathBuf,

    /// Time zone used for naming files and setting timestamps, in Region/City format
    #[arg(long, default_value = "Etc/UTC", value_parser = parse_time_zone)]
    time_zone: Tz,

    /// Recursively process all child directories
    #[arg(long)]
    recurse: bool,

    /// Recursively process child directories up to this many levels deep
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    depth: Option<u32>,

    /// Skip EXIF checking for all files
    #[arg(long)]
    skip_exif: bool,

    /// If EXIF and file name detection fail, use the file's modified time
    #[arg(long)]
    modified_fallback: bool,

    /// Run without renaming any files or modifying any timestamps
    #[arg(long)]
    dry_run: bool,

    /// Write additional output while running
    #[arg(short, long)]
    verbose: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn parse_directory(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ConfigError::NotADirectory(path).to_string())
    }
}

fn parse_time_zone(s: &str) -> Result<Tz, String> {
    datefix_core::parse_time_zone(s).map_err(|e| e.to_string())
}

fn report(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Renamed { from, to } => info!("Renamed {} to {}", from.display(), to.display()),
        FileOutcome::WouldRename { from, to } => info!("Would rename {} to {}", from.display(), to.display()),
        FileOutcome::TimestampOnly(path) => debug!("Set timestamps on {}", path.display()),
        FileOutcome::Unchanged(path) => debug!("{} already named correctly", path.display()),
        FileOutcome::SkippedNoPattern(path) => warn!("Failed to detect timestamp for {}", path.display()),
        FileOutcome::MoveFailed { from, to, error } => {
            error!("Failed to move {} to {}: {}", from.display(), to.display(), error)
        }
        FileOutcome::TimestampFailed { path, error, .. } => {
            error!("Failed to set file timestamps on {}: {}", path.display(), error)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();

    let recursion = Recursion::from_args(cli.recurse, cli.depth.map(|d| d as usize))?;
    let options = ProcessOptions {
        root: cli.path,
        time_zone: cli.time_zone,
        recursion,
        skip_metadata: cli.skip_exif,
        modified_fallback: cli.modified_fallback,
        dry_run: cli.dry_run,
    };
    debug!("{:?}", options);

    let t_total = std::time::Instant::now();
    let summary = datefix_core::process(&options, &report)?;

    let verb = if summary.dry_run { "would rename" } else { "renamed" };
    info!(
        "Done. Processed {} files, matched {}, {} {} ({:.2}s)",
        summary.processed,
        summary.matched,
        verb,
        summary.renamed,
        t_total.elapsed().as_secs_f64()
    );
    if summary.failed > 0 {
        warn!("{} file(s) failed", summary.failed);
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
