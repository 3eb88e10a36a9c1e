use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shutterstamp::exif::FallbackReader;
use shutterstamp::naming::DEFAULT_TEMPLATE;
use shutterstamp::opener::platform_opener;
use shutterstamp::{LibraryConfig, MediaItem, MediaLibrary, RenameOptions, Timeshift};

#[derive(Parser)]
#[command(name = "shutterstamp")]
#[command(version)]
#[command(about = "Rename photos and videos by the time they were taken")]
#[command(long_about = "Renames photo and video files after the capture timestamp stored in their metadata.

Metadata is read with exiftool when it is installed, otherwise with a built-in EXIF reader.
Default name format: YYYY-MM-DD HH.MM.SS.<ext>
Existing files are never overwritten: taken file names get -1, -2, ... suffixes,
taken directory names get (1), (2), ... suffixes.")]
struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RenameArgs {
    /// strftime template for the new names
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    format: String,
    /// Keep the extension's case instead of lowercasing it
    #[arg(long)]
    keep_extension_case: bool,
    /// Days to add to every timestamp (may be negative)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    days: i64,
    /// Hours to add to every timestamp (may be negative)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    hours: i64,
    /// Minutes to add to every timestamp (may be negative)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    minutes: i64,
    /// Seconds to add to every timestamp (may be negative)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    seconds: i64,
    /// Log individual renames at debug level only
    #[arg(short, long)]
    quiet: bool,
}

impl RenameArgs {
    fn options(&self) -> RenameOptions {
        RenameOptions::default()
            .with_template(self.format.clone())
            .with_lowercase_extension(!self.keep_extension_case)
            .with_verbose(!self.quiet)
            .with_timeshift(Timeshift {
                days: self.days,
                hours: self.hours,
                minutes: self.minutes,
                seconds: self.seconds,
            })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rename every photo and video in a directory by capture timestamp
    Library {
        directory: PathBuf,
        #[command(flatten)]
        rename: RenameArgs,
        /// JSON file with extension classes and hidden prefix
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Rename individual files by capture timestamp (glob patterns accepted)
    Files {
        patterns: Vec<String>,
        #[command(flatten)]
        rename: RenameArgs,
    },
    /// Rename a library directory, adding " (N)" if the name is taken
    RenameDir { directory: PathBuf, new_name: String },
    /// Open a library's media with the default application
    Open {
        directory: PathBuf,
        /// Only images
        #[arg(long, conflicts_with = "videos")]
        images: bool,
        /// Only videos
        #[arg(long)]
        videos: bool,
        /// JSON file with extension classes and hidden prefix
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the shift that moves REFERENCE's timestamp onto TARGET's
    Timeshift {
        reference: PathBuf,
        target: PathBuf,
        /// Extra seconds added to the computed shift
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        delta_seconds: i64,
    },
    /// Print timestamp and camera of files
    Info { files: Vec<PathBuf> },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Library { directory, rename, config } => rename_library_contents(&directory, &rename, config),
        Commands::Files { patterns, rename } => rename_files(&patterns, &rename),
        Commands::RenameDir { directory, new_name } => rename_directory(&directory, &new_name),
        Commands::Open { directory, images, videos, config } => open_library(&directory, images, videos, config),
        Commands::Timeshift { reference, target, delta_seconds } => {
            print_timeshift(&reference, &target, delta_seconds)
        }
        Commands::Info { files } => print_info(&files),
    }
}

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

fn open_library_at(directory: &Path, config: Option<PathBuf>) -> Result<MediaLibrary> {
    let config = match config {
        Some(path) => LibraryConfig::from_json_file(&path)?,
        None => LibraryConfig::default(),
    };
    MediaLibrary::with_config(directory, config, Arc::new(FallbackReader::default()))
        .with_context(|| format!("Failed to open library {}", directory.display()))
}

fn rename_library_contents(directory: &Path, args: &RenameArgs, config: Option<PathBuf>) -> Result<()> {
    let library = open_library_at(directory, config)?;
    let options = args.options();

    let total = library.items()?.len();
    info!("Found {} media files in {}", total, library.directory().display());

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Renaming files");

    let result = library.rename_contents_by_date_with(&options, |item| {
        pb.set_message(item.name());
        pb.inc(1);
    });

    match result {
        Ok(()) => {
            pb.finish_with_message("Renaming complete");
            println!("Renamed {} files in {}", total, library.directory().display());
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Renaming stopped");
            Err(e).context("Library rename stopped at the first failure")
        }
    }
}

fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let mut matched = false;
        for entry in glob::glob(pattern).with_context(|| format!("Invalid pattern: {}", pattern))? {
            files.push(entry?);
            matched = true;
        }
        if !matched {
            files.push(PathBuf::from(pattern));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn rename_files(patterns: &[String], args: &RenameArgs) -> Result<()> {
    if patterns.is_empty() {
        anyhow::bail!("No files specified");
    }

    let options = args.options();
    let mut errors = 0;

    for path in expand_patterns(patterns)? {
        let outcome = MediaItem::new(&path).and_then(|mut item| {
            item.rename_by_date(&options)?;
            Ok(item)
        });
        match outcome {
            Ok(item) => println!("{} -> {}", path.display(), item.name()),
            Err(e) => {
                warn!("{}", e);
                println!("Error: {}: {}", path.display(), e);
                errors += 1;
            }
        }
    }

    if errors > 0 {
        anyhow::bail!("{} file(s) could not be renamed", errors);
    }
    Ok(())
}

fn rename_directory(directory: &Path, new_name: &str) -> Result<()> {
    let mut library = open_library_at(directory, None)?;
    library.rename(new_name, true)?;
    println!("{} -> {}", directory.display(), library.directory().display());
    Ok(())
}

fn open_library(directory: &Path, images: bool, videos: bool, config: Option<PathBuf>) -> Result<()> {
    let library = open_library_at(directory, config)?;
    let opener = platform_opener();

    let result = if images {
        library.open_images(opener.as_ref())
    } else if videos {
        library.open_videos(opener.as_ref())
    } else {
        library.open(opener.as_ref())
    };
    result.context("Failed to open media")
}

fn print_timeshift(reference: &Path, target: &Path, delta_seconds: i64) -> Result<()> {
    let reference = MediaItem::new(reference)?;
    let target = MediaItem::new(target)?;
    let delta = Duration::try_seconds(delta_seconds).context("--delta-seconds is out of range")?;
    let shift = reference.timeshift_to(&target, delta)?;

    println!(
        "--days {} --hours {} --minutes {} --seconds {}",
        shift.days, shift.hours, shift.minutes, shift.seconds
    );
    Ok(())
}

fn print_info(files: &[PathBuf]) -> Result<()> {
    for path in files {
        let item = MediaItem::new(path)?;
        let timestamp = match item.timestamp() {
            Ok(ts) => ts.to_string(),
            Err(e) => e.to_string(),
        };
        println!("{}", item.path().display());
        println!("  timestamp: {}", timestamp);
        println!("  camera:    {} {}", item.camera_make(), item.camera_model());
    }
    Ok(())
}
