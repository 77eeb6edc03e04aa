//! Canvas configuration
//!
//! `CanvasConfig` is the on-disk TOML form where every field is optional.
//! `CanvasSettings` is what a canvas is actually built from.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::color::Color;
use crate::error::{CanvasError, Result};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_FPS: u32 = 60;
pub const DEFAULT_COMMAND_CAPACITY: usize = 4096;
/// Largest accepted canvas side in pixels.
pub const MAX_SIDE: u32 = 16_384;

/// Window geometry and title
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WindowStyle {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanvasConfig {
    pub fps: Option<u32>,
    pub background_color: Option<[u8; 4]>,
    pub command_capacity: Option<usize>,
    pub font_path: Option<PathBuf>,
    pub screenshot_dir: Option<PathBuf>,
    pub show_fps: Option<bool>,
    // Tables serialize after plain values.
    #[serde(default)]
    pub window: WindowStyle,
}

/// Resolved settings with no optional fields
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub fps: u32,
    pub background_color: Color,
    pub command_capacity: usize,
    pub font_path: Option<PathBuf>,
    pub screenshot_dir: PathBuf,
    pub show_fps: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: "tsgl".into(),
            fps: DEFAULT_FPS,
            background_color: Color::WHITE,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            font_path: None,
            screenshot_dir: PathBuf::from("."),
            show_fps: false,
        }
    }
}

impl CanvasSettings {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CanvasError::InvalidConfig(format!(
                "canvas size {}x{} must be positive",
                self.width, self.height
            )));
        }
        if self.width > MAX_SIDE || self.height > MAX_SIDE {
            return Err(CanvasError::InvalidConfig(format!(
                "canvas size {}x{} exceeds {MAX_SIDE} pixels per side",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(CanvasError::InvalidConfig("fps must be positive".into()));
        }
        if self.command_capacity == 0 {
            return Err(CanvasError::InvalidConfig(
                "command capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        let d = CanvasSettings::default();
        Self {
            window: WindowStyle {
                width: Some(d.width),
                height: Some(d.height),
                title: Some(d.title),
            },
            fps: Some(d.fps),
            background_color: Some(d.background_color.to_rgba8()),
            command_capacity: Some(d.command_capacity),
            font_path: None,
            screenshot_dir: None,
            show_fps: Some(d.show_fps),
        }
    }
}

impl CanvasConfig {
    /// Get the path to the configuration file
    pub fn get_config_path() -> PathBuf {
        let config_dir = if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("tsgl")
        } else {
            PathBuf::from(".config/tsgl")
        };

        config_dir.join("config.toml")
    }

    /// Load the user configuration, writing the defaults out if there is none
    pub fn load_from_file() -> Result<Self> {
        Self::load_from_path(&Self::get_config_path())
    }

    pub fn save_to_file(&self) -> Result<()> {
        self.save_to_path(&Self::get_config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let default_config = Self::default();
                default_config.save_to_path(path)?;
                Ok(default_config)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Fill unset fields from the defaults.
    pub fn settings(&self) -> CanvasSettings {
        let d = CanvasSettings::default();
        CanvasSettings {
            width: self.window.width.unwrap_or(d.width),
            height: self.window.height.unwrap_or(d.height),
            title: self.window.title.clone().unwrap_or(d.title),
            fps: self.fps.unwrap_or(d.fps),
            background_color: self
                .background_color
                .map(Color::from_rgba8)
                .unwrap_or(d.background_color),
            command_capacity: self.command_capacity.unwrap_or(d.command_capacity),
            font_path: self.font_path.clone(),
            screenshot_dir: self.screenshot_dir.clone().unwrap_or(d.screenshot_dir),
            show_fps: self.show_fps.unwrap_or(d.show_fps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: CanvasConfig = toml::from_str(
            r#"
            fps = 30

            [window]
            width = 320
            "#,
        )
        .unwrap();
        let s = config.settings();
        assert_eq!((s.width, s.height, s.fps), (320, DEFAULT_HEIGHT, 30));
        assert_eq!(s.background_color, Color::WHITE);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn zero_values_fail_validation() {
        assert!(CanvasSettings::new(0, 10).validate().is_err());
        assert!(CanvasSettings::new(70_000, 70_000).validate().is_err());
        assert!(CanvasSettings::new(MAX_SIDE, 1).validate().is_ok());
        assert!(CanvasSettings::default().with_fps(0).validate().is_err());
        assert!(CanvasSettings::default()
            .with_command_capacity(0)
            .validate()
            .is_err());
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = toml::from_str::<CanvasConfig>("fps = \"fast\"").map_err(CanvasError::from);
        assert!(matches!(err, Err(CanvasError::ConfigParse(_))));
    }
}
