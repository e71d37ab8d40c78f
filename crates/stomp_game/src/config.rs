use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{GameError, GameResult};

pub const CONFIG_PATH: &str = "assets/game.json";

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Level document paths; the position in this list is the level index.
    pub levels: Vec<String>,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
}

pub fn load_config_from_path(path: &Path) -> GameResult<GameConfig> {
    let config_error = |reason: String| GameError::Config {
        path: path.display().to_string(),
        reason,
    };
    let raw = fs::read_to_string(path)
        .map_err(|e| config_error(format!("Failed to read config file: {e}")))?;
    let config: GameConfig = serde_json::from_str(&raw)
        .map_err(|e| config_error(format!("Failed to parse config JSON: {e}")))?;
    validate_config(&config).map_err(config_error)?;
    Ok(config)
}

fn validate_config(config: &GameConfig) -> Result<(), String> {
    if config.levels.is_empty() {
        return Err("Config validation failed: levels array is empty".to_string());
    }
    if config.width == 0 || config.height == 0 {
        return Err("Config validation failed: width and height must be > 0".to_string());
    }
    if !config.gravity.is_finite() {
        return Err("Config validation failed: gravity must be finite".to_string());
    }
    Ok(())
}

fn default_title() -> String {
    "Slime Stomp".to_string()
}

const fn default_width() -> u32 {
    800
}

const fn default_height() -> u32 {
    600
}

fn default_manifest() -> String {
    "assets/manifest.json".to_string()
}

const fn default_gravity() -> f32 {
    1200.0
}
