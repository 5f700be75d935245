use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::{BuildArgs, Cli, RefreshArgs, ResizeArgs, ResizeBoxArgs, ShowArgs};

/// Argument ids the user typed on the command line.
///
/// File config only fills values whose id is absent here.
#[derive(Debug, Clone, Default)]
pub(crate) struct CliValueSources {
    explicit: HashSet<String>,
}

impl CliValueSources {
    pub(crate) fn is_explicit(&self, id: &str) -> bool {
        self.explicit.contains(id)
    }
}

pub(crate) fn parse_cli_with_sources() -> (Cli, CliValueSources) {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    (cli, sources_from_matches(&matches))
}

pub(crate) fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    let mut explicit = HashSet::new();
    collect_commandline_ids(matches, &mut explicit);
    CliValueSources { explicit }
}

fn collect_commandline_ids(matches: &ArgMatches, explicit: &mut HashSet<String>) {
    for id in matches.ids() {
        if matches.value_source(id.as_str()) == Some(ValueSource::CommandLine) {
            explicit.insert(id.as_str().to_string());
        }
    }
    if let Some((_, sub_matches)) = matches.subcommand() {
        collect_commandline_ids(sub_matches, explicit);
    }
}

fn narrow<T: TryFrom<u64>>(field: &str, value: u64) -> Result<T> {
    T::try_from(value)
        .ok()
        .with_context(|| format!("Config value for `{field}` is out of range: {value}"))
}

pub(crate) fn apply_build_defaults(
    mut args: BuildArgs,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<BuildArgs> {
    let Some(file_config) = file_config else {
        return Ok(args);
    };

    if !cli_sources.is_explicit("species_file")
        && let Some(species_file) = &file_config.species_file
    {
        args.species_file = species_file.clone();
    }

    if !cli_sources.is_explicit("cache_dir")
        && let Some(cache_dir) = &file_config.cache_dir
    {
        args.cache_dir = cache_dir.clone();
    }

    if !cli_sources.is_explicit("images_per_species")
        && let Some(images) = file_config.images_per_species
    {
        args.images_per_species = narrow("images_per_species", images)?;
    }

    if !cli_sources.is_explicit("workers")
        && let Some(workers) = file_config.workers
    {
        args.workers = narrow("workers", workers)?;
    }

    if !cli_sources.is_explicit("rate_limit")
        && let Some(rate_limit) = file_config.rate_limit
    {
        args.rate_limit = rate_limit;
    }

    if !cli_sources.is_explicit("max_retries")
        && let Some(max_retries) = file_config.max_retries
    {
        args.max_retries = narrow("max_retries", max_retries)?;
    }

    if !cli_sources.is_explicit("no_quality_checks")
        && let Some(quality_checks) = file_config.quality_checks
    {
        args.no_quality_checks = !quality_checks;
    }

    if !cli_sources.is_explicit("search_url")
        && let Some(search_url) = &file_config.search_url
    {
        args.search_url = search_url.clone();
    }

    if !cli_sources.is_explicit("target_width")
        && let Some(target_width) = file_config.target_width
    {
        args.target_width = narrow("target_width", target_width)?;
    }

    if !cli_sources.is_explicit("min_width")
        && let Some(min_width) = file_config.min_width
    {
        args.min_width = narrow("min_width", min_width)?;
    }

    apply_resize_box_defaults(&mut args.resize_box, cli_sources, file_config)?;
    Ok(args)
}

pub(crate) fn apply_resize_defaults(
    mut args: ResizeArgs,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<ResizeArgs> {
    let Some(file_config) = file_config else {
        return Ok(args);
    };

    if !cli_sources.is_explicit("cache_dir")
        && let Some(cache_dir) = &file_config.cache_dir
    {
        args.cache_dir = cache_dir.clone();
    }

    apply_resize_box_defaults(&mut args.resize_box, cli_sources, file_config)?;
    Ok(args)
}

fn apply_resize_box_defaults(
    resize_box: &mut ResizeBoxArgs,
    cli_sources: &CliValueSources,
    file_config: &FileConfig,
) -> Result<()> {
    if !cli_sources.is_explicit("max_width")
        && let Some(max_width) = file_config.max_width
    {
        resize_box.max_width = narrow("max_width", max_width)?;
    }

    if !cli_sources.is_explicit("max_height")
        && let Some(max_height) = file_config.max_height
    {
        resize_box.max_height = narrow("max_height", max_height)?;
    }

    if !cli_sources.is_explicit("resize_workers")
        && let Some(resize_workers) = file_config.resize_workers
    {
        resize_box.resize_workers = Some(narrow("resize_workers", resize_workers)?);
    }
    Ok(())
}

pub(crate) fn apply_refresh_defaults(
    mut args: RefreshArgs,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> RefreshArgs {
    if !cli_sources.is_explicit("species_file")
        && let Some(species_file) = file_config.and_then(|cfg| cfg.species_file.as_ref())
    {
        args.species_file = species_file.clone();
    }
    args
}

pub(crate) fn apply_show_defaults(
    mut args: ShowArgs,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> ShowArgs {
    if !cli_sources.is_explicit("cache_dir")
        && let Some(cache_dir) = file_config.and_then(|cfg| cfg.cache_dir.as_ref())
    {
        args.cache_dir = cache_dir.clone();
    }
    args
}

/// Effective `(verbose, quiet)` after applying the file's verbosity when
/// neither `-v` nor `-q` was given.
pub(crate) fn resolve_verbosity(
    cli: &Cli,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> (u8, bool) {
    if should_force_cli_log_level(cli_sources) {
        return (cli.verbose, cli.quiet);
    }
    match file_config.and_then(|cfg| cfg.verbosity) {
        Some(VerbositySetting::Default) => (0, false),
        Some(VerbositySetting::Verbose) => (1, false),
        Some(VerbositySetting::Quiet) => (0, true),
        Some(VerbositySetting::Debug) => (2, false),
        None => (cli.verbose, cli.quiet),
    }
}

pub(crate) fn resolve_default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

pub(crate) fn should_force_cli_log_level(cli_sources: &CliValueSources) -> bool {
    cli_sources.is_explicit("verbose") || cli_sources.is_explicit("quiet")
}

pub(crate) fn verbosity_label(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        VerbositySetting::Quiet.as_str()
    } else if verbose == 0 {
        VerbositySetting::Default.as_str()
    } else if verbose == 1 {
        VerbositySetting::Verbose.as_str()
    } else {
        VerbositySetting::Debug.as_str()
    }
}
