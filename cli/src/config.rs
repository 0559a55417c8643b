//! TOML config file for the CLI.
//!
//! Every key supplies a default for the matching command-line option;
//! flags always win over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Contents of a drift config file.
///
/// ```toml
/// database_url = "mysql://root@localhost/app"
/// tables_dir = "./tables"
/// output_dir = "./migrations"
/// rules_dir = "./rules"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub tables_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub rules_dir: Option<PathBuf>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
