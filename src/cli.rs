use clap::{ArgAction, Parser};
use std::path::PathBuf;
use thumbs_config::Overrides;
use tracing_subscriber::filter::LevelFilter;

/// Generate downscaled copies of every image in a directory tree.
///
/// Thumbnails are written next to each source image, as
/// `<FORMAT>/<size>px/<name>-<size>px.<ext>`, for every size in
/// 2500, 2000, 1500, 1000, 750, 500 and 250 that is smaller than the image.
/// Files that already look like thumbnails are ignored, so re-running over
/// the same tree is safe.
#[derive(Debug, Parser)]
#[command(name = "thumbs", version)]
pub struct Cli {
    /// Directory to search (recursively) for source images.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Output format: png, jpg, jpeg, webp, bmp or gif.
    #[arg(value_name = "FORMAT")]
    pub format: String,

    /// ImageMagick executable; `magick` or `convert` from PATH when omitted.
    #[arg(long, value_name = "PATH")]
    pub engine: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of engine processes running at once.
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Time limit for a single engine invocation, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra attempts when the engine fails to start or times out.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Log more (repeat for even more).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            engine: self.engine.clone(),
            concurrency: self.concurrency,
            timeout: self.timeout,
            retries: self.retries,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}
