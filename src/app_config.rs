//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Flat `key = value` file configuration for birdcache defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Default species CSV path.
    pub species_file: Option<PathBuf>,
    /// Default cache root.
    pub cache_dir: Option<PathBuf>,
    /// Default images per species.
    pub images_per_species: Option<u64>,
    /// Default build worker count (same range as CLI).
    pub workers: Option<u64>,
    /// Default base request delay in milliseconds.
    pub rate_limit: Option<u64>,
    /// Default attempt ceiling per request.
    pub max_retries: Option<u64>,
    /// Fetch file pages to filter candidates.
    pub quality_checks: Option<bool>,
    /// Media search base URL.
    pub search_url: Option<String>,
    /// Width requested from the media host.
    pub target_width: Option<u64>,
    /// Minimum original width accepted.
    pub min_width: Option<u64>,
    /// Resize bounding box width.
    pub max_width: Option<u64>,
    /// Resize bounding box height.
    pub max_height: Option<u64>,
    /// Resize worker count.
    pub resize_workers: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("images_per_species", self.images_per_species, 1, 50)?;
        validate_range("workers", self.workers, 1, 16)?;
        validate_range("rate_limit", self.rate_limit, 0, 60_000)?;
        validate_range("max_retries", self.max_retries, 1, 10)?;
        validate_range("target_width", self.target_width, 1, 10_000)?;
        validate_range("min_width", self.min_width, 0, 10_000)?;
        validate_range("max_width", self.max_width, 1, 10_000)?;
        validate_range("max_height", self.max_height, 1, 10_000)?;
        validate_range("resize_workers", self.resize_workers, 1, 64)?;
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Verbose => "verbose",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Indicates whether configuration was loaded from disk.
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/birdcache/config.toml`
/// 2. `$HOME/.config/birdcache/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("birdcache")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("birdcache")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_number = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "species_file" => {
                cfg.species_file = Some(parse_string_literal(value).with_context(context)?.into());
            }
            "cache_dir" => {
                cfg.cache_dir = Some(parse_string_literal(value).with_context(context)?.into());
            }
            "search_url" => {
                cfg.search_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "images_per_species" => {
                cfg.images_per_species = Some(parse_integer_u64(value).with_context(context)?);
            }
            "workers" => cfg.workers = Some(parse_integer_u64(value).with_context(context)?),
            "rate_limit" => cfg.rate_limit = Some(parse_integer_u64(value).with_context(context)?),
            "max_retries" => {
                cfg.max_retries = Some(parse_integer_u64(value).with_context(context)?);
            }
            "quality_checks" => {
                cfg.quality_checks = Some(parse_boolean(value).with_context(context)?);
            }
            "target_width" => {
                cfg.target_width = Some(parse_integer_u64(value).with_context(context)?);
            }
            "min_width" => cfg.min_width = Some(parse_integer_u64(value).with_context(context)?),
            "max_width" => cfg.max_width = Some(parse_integer_u64(value).with_context(context)?),
            "max_height" => cfg.max_height = Some(parse_integer_u64(value).with_context(context)?),
            "resize_workers" => {
                cfg.resize_workers = Some(parse_integer_u64(value).with_context(context)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
