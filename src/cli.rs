//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use birdcache_core::builder::{DEFAULT_IMAGES_PER_SPECIES, DEFAULT_WORKERS};
use birdcache_core::resize::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH};
use birdcache_core::resolver::{DEFAULT_MIN_WIDTH, DEFAULT_SEARCH_BASE_URL, DEFAULT_TARGET_WIDTH};
use birdcache_core::transport::DEFAULT_MAX_ATTEMPTS;
use birdcache_core::transport::constants::DEFAULT_REQUEST_DELAY;

/// Default species list path.
pub const DEFAULT_SPECIES_FILE: &str = "species_list.csv";

/// Default cache root.
pub const DEFAULT_CACHE_DIR: &str = "bird_images_cache";

#[allow(clippy::cast_possible_truncation)]
const DEFAULT_RATE_LIMIT_MS: u64 = DEFAULT_REQUEST_DELAY.as_millis() as u64;

/// Build and maintain an offline cache of attributed bird photographs.
///
/// Birdcache fetches a few images per species from a public media search,
/// stores them with attribution sidecars, and keeps them display-sized.
#[derive(Parser, Debug)]
#[command(name = "birdcache")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download images for every species that is not yet complete
    Build(BuildArgs),
    /// Shrink oversized cached images to the display box
    Resize(ResizeArgs),
    /// Replace the species list with one from a listing service
    Refresh(RefreshArgs),
    /// Print the cached image a display would show for a species
    Show(ShowArgs),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the effective build settings and where they came from
    Show,
}

/// Display bounding box shared by `build --resize` and `resize`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ResizeBoxArgs {
    /// Bounding box width in pixels
    #[arg(long, default_value_t = DEFAULT_MAX_WIDTH, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub max_width: u32,

    /// Bounding box height in pixels
    #[arg(long, default_value_t = DEFAULT_MAX_HEIGHT, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub max_height: u32,

    /// Concurrent resize jobs (default: number of CPUs)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub resize_workers: Option<u8>,
}

impl Default for ResizeBoxArgs {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            resize_workers: None,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    /// Species CSV (`common name, scientific name` per row, header ignored)
    #[arg(long, default_value = DEFAULT_SPECIES_FILE)]
    pub species_file: PathBuf,

    /// Cache root directory
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Target images per species (1-50)
    #[arg(short = 'n', long, default_value_t = DEFAULT_IMAGES_PER_SPECIES as u8, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub images_per_species: u8,

    /// Concurrent species tasks (1-16)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub workers: u8,

    /// Base delay between requests in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, default_value_t = DEFAULT_RATE_LIMIT_MS, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: u64,

    /// Attempts per request before giving up (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Skip file-page checks (subject filter, resolution, author)
    #[arg(long)]
    pub no_quality_checks: bool,

    /// Run a resize pass after the build
    #[arg(long)]
    pub resize: bool,

    /// Media search base URL
    #[arg(long, default_value = DEFAULT_SEARCH_BASE_URL)]
    pub search_url: String,

    /// Width requested from the media host
    #[arg(long, default_value_t = DEFAULT_TARGET_WIDTH, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub target_width: u32,

    /// Originals narrower than this are rejected
    #[arg(long, default_value_t = DEFAULT_MIN_WIDTH, value_parser = clap::value_parser!(u32).range(0..=10_000))]
    pub min_width: u32,

    #[command(flatten)]
    pub resize_box: ResizeBoxArgs,
}

impl Default for BuildArgs {
    fn default() -> Self {
        Self {
            species_file: PathBuf::from(DEFAULT_SPECIES_FILE),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            images_per_species: DEFAULT_IMAGES_PER_SPECIES as u8,
            workers: DEFAULT_WORKERS as u8,
            rate_limit: DEFAULT_RATE_LIMIT_MS,
            max_retries: DEFAULT_MAX_ATTEMPTS as u8,
            no_quality_checks: false,
            resize: false,
            search_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            target_width: DEFAULT_TARGET_WIDTH,
            min_width: DEFAULT_MIN_WIDTH,
            resize_box: ResizeBoxArgs::default(),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ResizeArgs {
    /// Cache root directory
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    #[command(flatten)]
    pub resize_box: ResizeBoxArgs,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RefreshArgs {
    /// Listing endpoint returning location and species as JSON
    #[arg(long)]
    pub api_url: String,

    /// Species CSV to write
    #[arg(long, default_value = DEFAULT_SPECIES_FILE)]
    pub species_file: PathBuf,

    /// Write without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ShowArgs {
    /// Species common name, e.g. "American Robin"
    pub common_name: String,

    /// Cache root directory
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Rotate deterministically by this timestamp instead of picking at random
    #[arg(long)]
    pub timestamp: Option<String>,
}
