//! Configuration file management for livewave.
//!
//! This module handles loading the application configuration from TOML and
//! turning it into the resolved settings the pipeline runs with. A commented
//! default file is written on first run.

use crate::audio::CaptureSettings;
use crate::controller::{PipelineConfig, WindowSettings};
use crate::error::PipelineError;
use crate::pipeline::{ColorThresholdTable, Rgb};
use crate::render::RenderStyle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/livewave.toml");

/// Which input device to capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSelection {
    /// The system default input device
    #[default]
    Default,
    /// A numeric ID from `livewave list-devices`
    Id(usize),
}

impl DeviceSelection {
    pub fn id(self) -> Option<usize> {
        match self {
            Self::Default => None,
            Self::Id(id) => Some(id),
        }
    }
}

impl fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for DeviceSelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Default => serializer.serialize_str("default"),
            Self::Id(id) => serializer.serialize_u64(*id as u64),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceSelection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(usize),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(Self::Id(id)),
            Raw::Name(name) if name.eq_ignore_ascii_case("default") => Ok(Self::Default),
            Raw::Name(name) => name.trim().parse().map(Self::Id).map_err(|_| {
                serde::de::Error::custom(format!(
                    "device must be \"default\" or a numeric ID from 'livewave list-devices', got \"{name}\""
                ))
            }),
        }
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `livewave list-devices`
    #[serde(default)]
    pub device: DeviceSelection,
    /// Capture sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Samples per chunk; one chunk is drawn per frame
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_chunk_size() -> usize {
    1024
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelection::Default,
            sample_rate: default_sample_rate(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Window and line styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_background")]
    pub background: Rgb,
    /// Waveform line thickness in pixels
    #[serde(default = "default_line_thickness")]
    pub line_thickness: u32,
}

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    500
}

fn default_title() -> String {
    "Live Waveform Visualizer".to_string()
}

fn default_background() -> Rgb {
    Rgb::BLACK
}

fn default_line_thickness() -> u32 {
    2
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            background: default_background(),
            line_thickness: default_line_thickness(),
        }
    }
}

/// One loudness threshold and the color used from it upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorThreshold {
    /// Lower bound in dBFS, inclusive
    pub db: f32,
    pub color: Rgb,
}

/// Loudness-to-color mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorsConfig {
    /// Color below the first threshold (including silence)
    #[serde(default = "default_floor_color")]
    pub floor: Rgb,
    /// Strictly ascending thresholds
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<ColorThreshold>,
}

fn default_floor_color() -> Rgb {
    Rgb::WHITE
}

fn default_thresholds() -> Vec<ColorThreshold> {
    vec![
        ColorThreshold {
            db: -45.0,
            color: Rgb::YELLOW,
        },
        ColorThreshold {
            db: -30.0,
            color: Rgb::ORANGE,
        },
        ColorThreshold {
            db: -15.0,
            color: Rgb::RED,
        },
    ]
}

impl ColorsConfig {
    /// Builds the lookup table: `floor` at the silence level, then the
    /// configured thresholds.
    ///
    /// # Errors
    /// - `InvalidConfig` if the thresholds are not strictly ascending or not
    ///   above the silence floor
    pub fn to_table(&self) -> Result<ColorThresholdTable, PipelineError> {
        let thresholds: Vec<(f32, Rgb)> = self.thresholds.iter().map(|t| (t.db, t.color)).collect();
        ColorThresholdTable::with_floor(self.floor, &thresholds)
    }
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            floor: default_floor_color(),
            thresholds: default_thresholds(),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub device: Option<DeviceSelection>,
    pub sample_rate: Option<u32>,
    pub chunk_size: Option<usize>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivewaveConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub colors: ColorsConfig,
}

impl LivewaveConfig {
    /// Loads configuration from the user's config directory, writing the
    /// default file first if none exists.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = get_config_path()?;

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)?;
            tracing::info!("Default configuration written to {}", config_path.display());
        }

        let config_content = fs::read_to_string(&config_path)?;
        Self::from_toml_str(&config_content)
            .map_err(|e| anyhow::anyhow!("{}: {e}", config_path.display()))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Applies command-line overrides.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(device) = overrides.device {
            self.audio.device = device;
        }
        if let Some(sample_rate) = overrides.sample_rate {
            self.audio.sample_rate = sample_rate;
        }
        if let Some(chunk_size) = overrides.chunk_size {
            self.audio.chunk_size = chunk_size;
        }
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
    }

    /// Validates the configuration and resolves it into pipeline settings.
    ///
    /// # Errors
    /// - `InvalidConfig` for zero sizes or a non-ascending threshold list
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, PipelineError> {
        let positive = [
            ("audio.sample_rate", self.audio.sample_rate as u64),
            ("audio.chunk_size", self.audio.chunk_size as u64),
            ("window.width", self.window.width as u64),
            ("window.height", self.window.height as u64),
            ("window.line_thickness", self.window.line_thickness as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(PipelineError::InvalidConfig(format!(
                "{name} must be a positive integer"
            )));
        }

        let colors = self.colors.to_table()?;

        Ok(PipelineConfig {
            device: self.audio.device.id(),
            capture: CaptureSettings {
                sample_rate: self.audio.sample_rate,
                chunk_size: self.audio.chunk_size,
            },
            window: WindowSettings {
                title: self.window.title.clone(),
                width: self.window.width,
                height: self.window.height,
            },
            style: RenderStyle {
                background: self.window.background,
                line_thickness: self.window.line_thickness as f32,
            },
            colors: Arc::new(colors),
        })
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("livewave");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("livewave.toml"))
}
