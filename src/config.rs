//! Runtime configuration loaded from ~/.healthwatch/config.json.
//!
//! All fields carry serde defaults so a missing or partial file still
//! yields a usable config.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn default_window_hours() -> i64 {
    24
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Time span around a case's event time within which co-location
    /// counts as exposure.
    #[serde(default = "default_window_hours")]
    pub exposure_window_hours: i64,
    /// Timeout applied to each notification dispatch call.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            exposure_window_hours: default_window_hours(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
        }
    }
}

/// Get the canonical config file path (~/.healthwatch/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".healthwatch").join("config.json"))
}

/// Load configuration from ~/.healthwatch/config.json.
///
/// A missing file is not an error; defaults apply.
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

/// Write configuration back to disk, creating ~/.healthwatch/ if needed.
pub fn save_config(config: &Config) -> Result<(), String> {
    save_config_to(config, &config_path()?)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
}
