//! CLI command handlers.

mod build;
mod config;
mod refresh;
mod resize;
mod show;

pub use build::run_build_command;
pub use config::run_config_show_command;
pub use refresh::run_refresh_command;
pub use resize::run_resize_command;
pub use show::run_show_command;
