//! Configuration module for rigatlas imports
//!
//! Provides types and parsing for `rigatlas.toml` import settings.

pub mod loader;
pub mod schema;

pub use loader::{load_config, merge_cli_overrides, CliOverrides, ConfigError};
pub use schema::*;
