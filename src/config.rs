//! Configuration module.
//!
//! Handles loading and saving application settings from `settings.json`.

use crate::store::{self, DataDir};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Environment variable overriding the bundled resource directory.
pub const RESOURCES_ENV: &str = "KEYCLACK_RESOURCES";

/// Option names every settings document is expected to carry.
pub const KNOWN_KEYS: [&str; 5] = [
    "enabled",
    "volume",
    "minimize_to_tray",
    "auto_start",
    "allow_custom_sound_paths",
];

/// Main application settings.
///
/// Options this build does not recognise are kept in `extra` so the
/// document round-trips as a flat option map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether key presses produce sound.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Playback volume as a 0.0-1.0 fraction.
    #[serde(default = "default_volume", deserialize_with = "deserialize_volume")]
    pub volume: f64,
    #[serde(default = "default_true")]
    pub minimize_to_tray: bool,
    /// Launch at login.
    #[serde(default)]
    pub auto_start: bool,
    /// Whether sounds may live outside the managed `sounds/` directory.
    #[serde(default = "default_true")]
    pub allow_custom_sound_paths: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
            minimize_to_tray: true,
            auto_start: false,
            allow_custom_sound_paths: true,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Returns one option as a JSON value.
    pub fn get(&self, name: &str) -> Option<Value> {
        serde_json::to_value(self).ok()?.get(name).cloned()
    }

    /// Sets one option. The settings are left untouched when the value has
    /// the wrong type for a recognised option.
    ///
    /// A new volume is clamped to 0.0-1.0; only documents read from disk
    /// get the legacy percentage reading.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), serde_json::Error> {
        let value = match (name, value.as_f64()) {
            ("volume", Some(volume)) => Value::from(clamp_volume(volume)),
            _ => value,
        };
        let mut map = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(name.to_string(), value);
        *self = serde_json::from_value(Value::Object(map))?;
        Ok(())
    }
}

/// Clamps a volume into 0.0-1.0, reading values above 1 as percentages.
pub fn normalize_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        return default_volume();
    }
    let fraction = if volume > 1.0 { volume / 100.0 } else { volume };
    fraction.clamp(0.0, 1.0)
}

/// Clamps a volume fraction into 0.0-1.0.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        default_volume()
    } else {
        volume.clamp(0.0, 1.0)
    }
}

fn deserialize_volume<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    f64::deserialize(deserializer).map(normalize_volume)
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_volume() -> f64 {
    0.8
}

/// Configuration manager.
pub struct ConfigManager {
    data_dir: DataDir,
    settings: Settings,
}

impl ConfigManager {
    /// Loads settings from the data directory.
    ///
    /// Defaults are merged in for missing options, and the merged document
    /// is written back when anything was missing.
    pub fn load(data_dir: DataDir) -> Self {
        let path = data_dir.settings_file();
        let raw: Option<Map<String, Value>> = if path.exists() {
            match store::read_json(&path) {
                Ok(map) => Some(map),
                Err(e) => {
                    log::warn!("Failed to load settings: {}, using defaults", e);
                    None
                }
            }
        } else {
            None
        };

        let settings = raw
            .clone()
            .map(|map| {
                serde_json::from_value(Value::Object(map)).unwrap_or_else(|e| {
                    log::warn!("Failed to parse settings: {}, using defaults", e);
                    Settings::default()
                })
            })
            .unwrap_or_default();

        let manager = Self { data_dir, settings };
        let complete = raw
            .as_ref()
            .is_some_and(|map| KNOWN_KEYS.iter().all(|key| map.contains_key(*key)));
        if !complete {
            manager.save();
        }
        manager
    }

    /// Re-reads settings from disk.
    pub fn reload(&mut self) {
        self.settings = store::load(&self.data_dir.settings_file(), Settings::default());
    }

    /// Saves settings to file.
    pub fn save(&self) -> bool {
        store::save(&self.data_dir.settings_file(), &self.settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    pub fn get_setting(&self, name: &str) -> Option<Value> {
        self.settings.get(name)
    }

    /// Sets one option and persists the document.
    pub fn set_setting(&mut self, name: &str, value: Value) -> bool {
        if let Err(e) = self.settings.set(name, value) {
            log::warn!("Rejected value for setting {}: {}", name, e);
            return false;
        }
        self.save()
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        self.settings.enabled = enabled;
        self.save()
    }

    pub fn volume(&self) -> f64 {
        self.settings.volume
    }

    /// Stores the volume fraction, clamped to 0.0-1.0.
    pub fn set_volume(&mut self, volume: f64) -> bool {
        self.settings.volume = clamp_volume(volume);
        self.save()
    }

    pub fn allows_custom_sound_paths(&self) -> bool {
        self.settings.allow_custom_sound_paths
    }
}

/// Gets the directory holding bundled resources.
pub fn resource_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(RESOURCES_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    // Try to use the directory where the executable is located
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join("resources");
        }
    }
    // Fallback to current directory
    PathBuf::from("resources")
}
