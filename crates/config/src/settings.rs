// Application settings
// Loaded from ~/.config/playground/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::keybindings::{KeyCombo, Keybindings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Run scheduling
    #[serde(rename = "run.autoRun")]
    pub auto_run: bool,

    #[serde(rename = "run.debounceMs")]
    pub debounce_ms: u64,

    #[serde(rename = "run.autosaveMs")]
    pub autosave_ms: u64,

    // Preview host
    #[serde(rename = "preview.host")]
    pub host: String,

    #[serde(rename = "preview.port")]
    pub port: u16,

    #[serde(rename = "preview.openBrowser")]
    pub open_browser: bool,

    #[serde(rename = "preview.pollMs")]
    pub poll_ms: u64,

    // Console
    #[serde(rename = "console.viewLen")]
    pub console_view_len: usize,

    // Keyboard
    #[serde(rename = "keys.run")]
    pub key_run: String,

    #[serde(rename = "keys.save")]
    pub key_save: String,

    #[serde(rename = "keys.open")]
    pub key_open: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Run
            auto_run: true,
            debounce_ms: 800,
            autosave_ms: 1000,
            // Preview
            host: "127.0.0.1".to_string(),
            port: 4545,
            open_browser: true,
            poll_ms: 50,
            // Console
            console_view_len: 200,
            // Keyboard
            key_run: "ctrl+enter".to_string(),
            key_save: "ctrl+s".to_string(),
            key_open: "ctrl+o".to_string(),
        }
    }
}

const DEFAULT_SETTINGS_FILE: &str = r#"{
    // Run scheduling
    // With autoRun on, the preview rebuilds once edits settle for debounceMs.
    "run.autoRun": true,
    "run.debounceMs": 800,
    "run.autosaveMs": 1000,

    // Preview host (playground serve)
    "preview.host": "127.0.0.1",
    "preview.port": 4545,
    "preview.openBrowser": true,
    "preview.pollMs": 50,

    // Console panel
    "console.viewLen": 200,

    // Keyboard shortcuts in the preview page
    "keys.run": "ctrl+enter",
    "keys.save": "ctrl+s",
    "keys.open": "ctrl+o"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from the default location, creating it on first use
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }
        Self::load_from(&path)
    }

    /// Load settings from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(&path, json).map_err(|e| e.to_string())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_SETTINGS_FILE) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    /// Parsed shortcuts. An unparseable entry keeps its default binding.
    pub fn keybindings(&self) -> Keybindings {
        let defaults = Keybindings::default();
        let parse_or = |raw: &str, fallback: KeyCombo, action: &str| {
            KeyCombo::parse(raw).unwrap_or_else(|e| {
                log::warn!("Invalid keys.{} binding '{}': {}; using {}", action, raw, e, fallback);
                fallback
            })
        };
        Keybindings {
            run: parse_or(&self.key_run, defaults.run, "run"),
            save: parse_or(&self.key_save, defaults.save, "save"),
            open: parse_or(&self.key_open, defaults.open, "open"),
        }
    }
}
