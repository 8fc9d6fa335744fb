//! Configuration system for the Area window server
//!
//! Loads configuration from TOML file at `~/.config/area/server.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub desktop: DesktopConfig,
    pub gesture: GestureConfig,
    pub decorator: DecoratorConfig,
    pub update: UpdateConfig,
}

impl ServerConfig {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;

        let config: ServerConfig =
            toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("server.toml"))
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

/// How mouse clicks and movement change activation and focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseMode {
    /// Clicking a window activates (raises and focuses) it
    ClickToActivate,
    /// Clicking a window focuses it without raising
    ClickToFocus,
    /// Focus follows the pointer; drag clicks raise on release
    FocusFollowsMouse,
}

/// Desktop-wide behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub mouse_mode: MouseMode,
    /// Deliver the activating click to unfocused windows
    pub accept_first_click: bool,
    pub workspace_count: u32,
    pub screen_width: i32,
    pub screen_height: i32,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            mouse_mode: MouseMode::ClickToActivate,
            accept_first_click: false,
            workspace_count: 4,
            screen_width: 1024,
            screen_height: 768,
        }
    }
}

/// Interactive move/resize tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum interval between processed drag/resize moves (~75Hz)
    pub move_rate_limit_us: u64,
    /// A press held longer than this is not a click
    pub activation_timeout_ms: u64,
    /// Squared pointer travel after which a drag click no longer activates
    pub activation_move_distance: f32,
    /// Distance from a screen edge at which a dragged window snaps
    pub snap_distance: i32,
    /// How long a snap holds the window
    pub snapping_duration_ms: u64,
    /// Pause after a snap before the next one may engage
    pub snapping_pause_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            move_rate_limit_us: 13_333,
            activation_timeout_ms: 500,
            activation_move_distance: 16.0,
            snap_distance: 8,
            snapping_duration_ms: 1_500,
            snapping_pause_ms: 3_000,
        }
    }
}

impl GestureConfig {
    pub fn move_rate_limit(&self) -> Duration {
        Duration::from_micros(self.move_rate_limit_us)
    }

    pub fn activation_timeout(&self) -> Duration {
        Duration::from_millis(self.activation_timeout_ms)
    }

    pub fn snapping_duration(&self) -> Duration {
        Duration::from_millis(self.snapping_duration_ms)
    }

    pub fn snapping_pause(&self) -> Duration {
        Duration::from_millis(self.snapping_pause_ms)
    }
}

/// Window decoration geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoratorConfig {
    /// Tab (title bar) height in pixels
    pub tab_height: i32,
    /// Tab width in pixels, clamped to the frame width
    pub tab_width: i32,
    /// Border width in pixels
    pub border_width: i32,
    /// Button size in pixels
    pub button_size: i32,
    /// Button padding in pixels
    pub button_padding: i32,
    /// Resize knob edge length for document windows
    pub resize_knob_size: i32,
    pub colors: DecoratorColors,
}

impl Default for DecoratorConfig {
    fn default() -> Self {
        Self {
            tab_height: 21,
            tab_width: 160,
            border_width: 5,
            button_size: 13,
            button_padding: 4,
            resize_knob_size: 14,
            colors: DecoratorColors::default(),
        }
    }
}

/// Decorator colors (hex: 0xRRGGBB)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoratorColors {
    pub background: u32,
    pub tab: u32,
    pub focused_tab: u32,
    pub border: u32,
    pub close_button: u32,
    pub zoom_button: u32,
    pub minimize_button: u32,
    pub pressed_button: u32,
}

impl Default for DecoratorColors {
    fn default() -> Self {
        // Nord Theme Colors
        Self {
            background: 0x2e3440,      // Polar Night Darkest
            tab: 0x3b4252,             // Polar Night Lighter
            focused_tab: 0x88c0d0,     // Frost Light
            border: 0x5e81ac,          // Frost Blue
            close_button: 0xbf616a,    // Aurora Red
            zoom_button: 0xa3be8c,     // Aurora Green
            minimize_button: 0xebcb8b, // Aurora Yellow
            pressed_button: 0x4c566a,  // Polar Night Lightest
        }
    }
}

/// Client update pipeline limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Messages a client may have queued before sends start failing
    pub client_queue_capacity: usize,
    /// Scratch regions a window may have out at once
    pub region_pool_limit: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            client_queue_capacity: 64,
            region_pool_limit: 32,
        }
    }
}
