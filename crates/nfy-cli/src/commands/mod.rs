//! Command handler modules for the `nfy` CLI.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod send;

use anyhow::{Context, Result};
use nfy_config::{ClientSettings, LoadedConfig};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config and resolve the client settings from it.
pub fn load_settings(config_paths: &[String]) -> Result<(LoadedConfig, ClientSettings)> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = nfy_config::load_layered_yaml(&path_refs)?;
    let settings = ClientSettings::from_config_json(&loaded.config_json)
        .context("resolving notification client settings failed")?;
    Ok((loaded, settings))
}
