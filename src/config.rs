//! Viewer configuration.
//!
//! Sources, highest priority first:
//! 1. The JSON file named by `STLVIEW_CONFIG`
//! 2. `stlview.json` in the working directory
//! 3. Built-in defaults
//!
//! Every field is optional in the file; missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "STLVIEW_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "stlview.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub editing: EditingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Background clear color.
    pub clear_color: [u8; 3],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "stlview".to_string(),
            width: 1280,
            height: 720,
            clear_color: [0xf2, 0xf2, 0xf2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Radians of orbit per pixel dragged.
    pub orbit_speed: f32,
    /// Distance scale applied per wheel line.
    pub zoom_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 1000.0,
            position: [-10.0, 30.0, 30.0],
            target: [0.0, 0.0, 0.0],
            orbit_speed: 0.008,
            zoom_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub ground_size: f32,
    pub ground_color: [u8; 3],
    pub grid_divisions: u32,
    pub grid_color: [u8; 3],
    pub grid_center_color: [u8; 3],
    pub axes_length: f32,
    pub show_bounds: bool,
    pub bounds_size: f32,
    pub bounds_color: [u8; 3],
    pub light_color: [u8; 3],
    pub light_intensity: f32,
    pub light_position: [f32; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            ground_size: 30.0,
            ground_color: [0xff, 0xff, 0xff],
            grid_divisions: 30,
            grid_color: [0xc8, 0xc8, 0x50],
            grid_center_color: [0x0f, 0x0f, 0x0f],
            axes_length: 20.0,
            show_bounds: true,
            bounds_size: 30.0,
            bounds_color: [0xff, 0xff, 0x00],
            light_color: [0xff, 0xff, 0xff],
            light_intensity: 1.0,
            light_position: [50.0, 50.0, 50.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    /// World units moved per arrow key press.
    pub nudge_step: f32,
    /// Material color given to imported meshes.
    pub default_color: [u8; 3],
    /// Offset applied to duplicated meshes.
    pub duplicate_offset: [f32; 3],
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            nudge_step: 0.1,
            default_color: [0x00, 0xff, 0x00],
            duplicate_offset: [2.0, 0.0, 2.0],
        }
    }
}

impl ViewerConfig {
    /// Loads the configuration, resolving the file location from the environment.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(&path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("stlview_config_{}_{}_{}.json", tag, std::process::id(), nonce));
        path
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let path = scratch_path("partial");
        fs::write(&path, r#"{ "editing": { "nudge_step": 0.5 }, "camera": { "fov_deg": 60 } }"#)
            .unwrap();

        let config = ViewerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.editing.nudge_step, 0.5);
        assert_eq!(config.editing.default_color, EditingConfig::default().default_color);
        assert_eq!(config.camera.fov_deg, 60.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.scene, SceneConfig::default());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let path = scratch_path("bad");
        fs::write(&path, "{ not json").unwrap();
        let err = ViewerConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = scratch_path("missing");
        let err = ViewerConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn defaults_serialize_and_parse_back() {
        let json = serde_json::to_string_pretty(&ViewerConfig::default()).unwrap();
        let parsed: ViewerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ViewerConfig::default());
    }
}
