//! `show` command: print the image a display would pick for a species.

use anyhow::Result;
use birdcache_core::cache::{CacheStore, ImageSelector};

use crate::ProcessExit;
use crate::cli::ShowArgs;

pub fn run_show_command(args: &ShowArgs) -> Result<ProcessExit> {
    if !args.cache_dir.is_dir() {
        eprintln!("No cache at '{}'", args.cache_dir.display());
        return Ok(ProcessExit::Failure);
    }
    let store = CacheStore::open(&args.cache_dir)?;

    let selector = args
        .timestamp
        .clone()
        .map_or(ImageSelector::Random, ImageSelector::Timestamp);

    let Some(asset) = store.pick_image(&args.common_name, &selector) else {
        eprintln!("No cached image for '{}'", args.common_name);
        return Ok(ProcessExit::Failure);
    };

    println!("image = {}", asset.relative_url);
    println!("path = {}", asset.image_path.display());
    println!("attribution = {}", asset.attribution);
    Ok(ProcessExit::Success)
}
