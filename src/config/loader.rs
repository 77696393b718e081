//! Configuration loading and discovery for `rigatlas.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{Alignment, ImportConfig, PixelOrigin, RigatlasConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for during discovery
pub const CONFIG_FILE_NAME: &str = "rigatlas.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse rigatlas.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub border: Option<u32>,
    pub default_alignment: Option<Alignment>,
    pub pixel_origin: Option<PixelOrigin>,
    pub dense_packed: Option<bool>,
    pub pixels_per_unit: Option<f32>,
}

/// Find rigatlas.toml by walking up from a directory.
///
/// Returns `None` once the filesystem root is reached without a match.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load import settings.
///
/// An explicit `path` must exist. Without one, `rigatlas.toml` is searched for
/// starting at `search_from`; if none is found the defaults are used.
pub fn load_config(path: Option<&Path>, search_from: &Path) -> Result<ImportConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_from(search_from.to_path_buf()),
    };

    match config_path {
        Some(p) => {
            log::info!("loading config from {}", p.display());
            load_config_file(&p)
        }
        None => Ok(ImportConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<ImportConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: RigatlasConfig = toml::from_str(&contents)?;

    let errors = config.import.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(config.import)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. The merged result
/// is validated again.
pub fn merge_cli_overrides(
    config: &mut ImportConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(border) = overrides.border {
        config.border = border;
    }
    if let Some(alignment) = overrides.default_alignment {
        config.default_alignment = alignment;
    }
    if let Some(origin) = overrides.pixel_origin {
        config.pixel_origin = origin;
    }
    if let Some(dense) = overrides.dense_packed {
        config.dense_packed = dense;
    }
    if let Some(ppu) = overrides.pixels_per_unit {
        config.pixels_per_unit = ppu;
    }

    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors))
    }
}
