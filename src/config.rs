//! Configuration system for strata
//!
//! Loads configuration from TOML file at `~/.config/strata/config.toml`
//! (or the path given with `--config`). Auto-generates the default config
//! file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decorations: DecorationsConfig,
    pub behavior: BehaviorConfig,
    pub snapping: SnappingConfig,
    pub sync: SyncConfig,
    pub workspaces: WorkspacesConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from the default location, or use defaults if the
    /// file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path, true)
    }

    /// Load configuration from an explicit path
    ///
    /// A missing file yields defaults; the default file is only written back
    /// when `write_default` is set.
    pub fn load_from(config_path: &Path, write_default: bool) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if write_default {
                if let Err(e) = Self::save_default(config_path) {
                    warn!("Failed to create default config file: {}", e);
                }
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {:?}", config_path))?;

        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("strata");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Frame decoration sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationsConfig {
    /// Titlebar height in pixels (top inset)
    pub titlebar_height: u32,
    /// Border width in pixels (left, right and bottom insets)
    pub border_width: u32,
}

impl Default for DecorationsConfig {
    fn default() -> Self {
        Self {
            titlebar_height: 24,
            border_width: 4,
        }
    }
}

/// Focus, placement and minimize behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// "click", "sloppy" or "mouse"
    pub focus_mode: String,
    /// "smart" or "strict"
    pub focus_new_windows: String,
    pub raise_on_click: bool,
    /// Skip animations and live feedback
    pub reduced_resources: bool,
    pub animate_minimize: bool,
    pub minimize_animation_ms: u64,
    /// Pixels the pointer must travel before a drag starts
    pub drag_threshold: i32,
    /// "smart", "center", "mouse" or "respect"
    pub placement: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            focus_mode: "click".to_string(),
            focus_new_windows: "smart".to_string(),
            raise_on_click: true,
            reduced_resources: false,
            animate_minimize: true,
            minimize_animation_ms: 200,
            drag_threshold: 8,
            placement: "smart".to_string(),
        }
    }
}

/// Edge resistance during interactive moves and resizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnappingConfig {
    pub snap_to_edges: bool,
    pub snap_to_windows: bool,
    pub snap_distance: i32,
}

impl Default for SnappingConfig {
    fn default() -> Self {
        Self {
            snap_to_edges: true,
            snap_to_windows: true,
            snap_distance: 10,
        }
    }
}

/// Resize throttling and `_NET_WM_SYNC_REQUEST` handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_resizes_per_second: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 1000,
            max_resizes_per_second: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesConfig {
    pub count: u32,
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self { count: 4 }
    }
}

/// Display server quirks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Let the server keep the client in place with StaticGravity while the
    /// frame moves and resizes at once
    pub use_static_gravity: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [sync]
            timeout_ms = 500

            [behavior]
            focus_new_windows = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.timeout_ms, 500);
        assert_eq!(config.sync.max_resizes_per_second, 25);
        assert_eq!(config.behavior.focus_new_windows, "strict");
        assert_eq!(config.decorations.titlebar_height, 24);
        assert!(!config.server.use_static_gravity);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.workspaces.count, 4);
        assert_eq!(parsed.snapping.snap_distance, 10);
    }

    #[test]
    fn missing_explicit_path_gives_defaults() {
        let path = std::env::temp_dir().join("strata-config-that-does-not-exist.toml");
        let config = Config::load_from(&path, false).unwrap();
        assert_eq!(config.behavior.drag_threshold, 8);
        assert!(!path.exists());
    }
}
