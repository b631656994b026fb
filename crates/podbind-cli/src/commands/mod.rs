pub mod config;
pub mod offer_match;

use std::path::Path;

use anyhow::{Context, Result};
use podbind_core::BindConfig;

/// Load `podbind.toml`, or the defaults when no path is given.
pub fn load_config(path: Option<&str>) -> Result<BindConfig> {
    match path {
        Some(path) => BindConfig::from_file(Path::new(path))
            .with_context(|| format!("loading config from {path}")),
        None => Ok(BindConfig::default()),
    }
}
