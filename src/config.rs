//! Configuration file support.
//!
//! Settings are stored as pretty-printed JSON. Every field except the
//! version has a default, so older or hand-written files load cleanly.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::{BoolStyle, WriteOptions};
use crate::model::{Color, FaceAttributes};

/// Verbosity of the crate's `log` output.
///
/// Stored in the config file under the same lowercase names `RUST_LOG`
/// accepts, so `"warn"` means the same thing in both places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    /// Parse a level name in any case, e.g. from a `--log-level` flag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let filter = s
            .trim()
            .parse::<log::LevelFilter>()
            .map_err(|_| ConfigError::UnknownLogLevel {
                value: s.to_string(),
            })?;
        Ok(match filter {
            log::LevelFilter::Off => LogLevel::Off,
            log::LevelFilter::Error => LogLevel::Error,
            log::LevelFilter::Warn => LogLevel::Warn,
            log::LevelFilter::Info => LogLevel::Info,
            log::LevelFilter::Debug => LogLevel::Debug,
            log::LevelFilter::Trace => LogLevel::Trace,
        })
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = log::LevelFilter::from(*self);
        f.write_str(&filter.as_str().to_ascii_lowercase())
    }
}

impl LogLevel {
    /// Install `env_logger` at this level.
    ///
    /// `RUST_LOG` still wins when set. Calling this twice is harmless; the
    /// second call only logs a debug message.
    pub fn init_logger(self) {
        let result = env_logger::Builder::new()
            .filter_level(self.into())
            .parse_default_env()
            .try_init();
        match result {
            Ok(()) => log::debug!("Logger initialized at {}", self),
            Err(e) => log::debug!("Logger already initialized: {}", e),
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Labelling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Directory label files are saved to. `None` saves next to the image.
    #[serde(default)]
    pub save_dir: Option<PathBuf>,

    /// Document-default outline color
    #[serde(default = "Color::default_line")]
    pub line_color: Color,

    /// Document-default fill color
    #[serde(default = "Color::default_fill")]
    pub fill_color: Color,

    /// Attributes given to newly drawn records
    #[serde(default)]
    pub attribute_defaults: FaceAttributes,

    /// Text written for the boolean attribute fields
    #[serde(default)]
    pub bool_style: BoolStyle,

    /// Save dirty documents automatically when leaving an image
    #[serde(default)]
    pub auto_save: bool,

    /// File of suggested labels, one per line
    #[serde(default)]
    pub predefined_classes: Option<PathBuf>,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl LabelConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            save_dir: None,
            line_color: Color::default_line(),
            fill_color: Color::default_fill(),
            attribute_defaults: FaceAttributes::new(),
            bool_style: BoolStyle::default(),
            auto_save: false,
            predefined_classes: None,
            log_level: LogLevel::default(),
        }
    }

    /// Builder-style save directory.
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }

    /// Options handed to the label codec when writing.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::new().bool_style(self.bool_style)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A log level name that `RUST_LOG` would not accept either
    #[error("Unknown log level {value:?}")]
    UnknownLogLevel { value: String },
}
