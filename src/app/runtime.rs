use std::io::{self, IsTerminal};

use anyhow::Result;
use tracing::{debug, info};

use crate::app::{config_runtime, terminal};
use crate::app_config::load_default_file_config;
use crate::cli::{Command, ConfigCommand};
use crate::{ProcessExit, commands};

pub(crate) async fn run_birdcache() -> Result<ProcessExit> {
    let (cli, cli_sources) = config_runtime::parse_cli_with_sources();
    let loaded_config = load_default_file_config()?;
    let file_config = loaded_config.config.as_ref();

    let (verbose, quiet) = config_runtime::resolve_verbosity(&cli, &cli_sources, file_config);
    let default_level = config_runtime::resolve_default_log_level(verbose, quiet);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    let dumb_terminal = terminal::is_dumb_terminal();
    let no_color =
        terminal::should_disable_color(terminal::no_color_env_requested(), dumb_terminal);
    terminal::init_tracing(default_level, force_cli_log_level, no_color);

    let show_progress =
        terminal::should_use_progress_bar(io::stderr().is_terminal(), quiet, dumb_terminal);

    debug!(?cli, config_loaded = loaded_config.loaded_from_file(), "CLI arguments parsed");

    match &cli.command {
        Command::Build(args) => {
            let args = config_runtime::apply_build_defaults(args.clone(), &cli_sources, file_config)?;
            info!(species_file = %args.species_file.display(), cache_dir = %args.cache_dir.display(), "Birdcache build starting");
            commands::run_build_command(&args, show_progress).await
        }
        Command::Resize(args) => {
            let args =
                config_runtime::apply_resize_defaults(args.clone(), &cli_sources, file_config)?;
            commands::run_resize_command(&args, show_progress).await
        }
        Command::Refresh(args) => {
            let args = config_runtime::apply_refresh_defaults(args.clone(), &cli_sources, file_config);
            commands::run_refresh_command(&args).await
        }
        Command::Show(args) => {
            let args = config_runtime::apply_show_defaults(args.clone(), &cli_sources, file_config);
            commands::run_show_command(&args)
        }
        Command::Config { command } => match command {
            ConfigCommand::Show => {
                commands::run_config_show_command(&cli, &cli_sources, &loaded_config)?;
                Ok(ProcessExit::Success)
            }
        },
    }
}
