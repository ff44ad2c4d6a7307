//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Example configuration written by `sensemidi init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../sensemidi.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<SensorConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SensorConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
