//! Config command handlers: show effective configuration.

use anyhow::Result;

use crate::app::config_runtime::{self, CliValueSources};
use crate::app_config::LoadedConfig;
use crate::cli::{BuildArgs, Cli};

pub fn run_config_show_command(
    cli: &Cli,
    cli_sources: &CliValueSources,
    loaded_config: &LoadedConfig,
) -> Result<()> {
    let effective = config_runtime::apply_build_defaults(
        BuildArgs::default(),
        cli_sources,
        loaded_config.config.as_ref(),
    )?;
    let (verbose, quiet) =
        config_runtime::resolve_verbosity(cli, cli_sources, loaded_config.config.as_ref());

    let resolved_path = loaded_config.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    println!("config_path = {resolved_path}");
    println!(
        "config_file = {}",
        if loaded_config.loaded_from_file() {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!("species_file = {}", effective.species_file.display());
    println!("cache_dir = {}", effective.cache_dir.display());
    println!("images_per_species = {}", effective.images_per_species);
    println!("workers = {}", effective.workers);
    println!("rate_limit = {}", effective.rate_limit);
    println!("max_retries = {}", effective.max_retries);
    println!("quality_checks = {}", !effective.no_quality_checks);
    println!("search_url = {}", effective.search_url);
    println!("target_width = {}", effective.target_width);
    println!("min_width = {}", effective.min_width);
    println!("max_width = {}", effective.resize_box.max_width);
    println!("max_height = {}", effective.resize_box.max_height);
    println!(
        "resize_workers = {}",
        effective
            .resize_box
            .resize_workers
            .map_or_else(|| "auto".to_string(), |n| n.to_string())
    );
    println!("verbosity = {}", config_runtime::verbosity_label(verbose, quiet));

    Ok(())
}
