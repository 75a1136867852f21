//! Configuration system
//!
//! World settings are plain serde structs that can be loaded from and saved to
//! `.toml` or `.ron` files.

mod world_config;

pub use serde::{Deserialize, Serialize};
pub use world_config::{BackendKind, SleepConfig, WorldConfig, MAX_TAGS};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match format {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// More collision tags than the filter matrix can hold
    #[error("Too many tags: {count} (maximum is {max})")]
    TooManyTags {
        /// Number of tags requested
        count: usize,
        /// Hard limit
        max: usize,
    },

    /// The same tag name appears twice
    #[error("Duplicate tag: {0}")]
    DuplicateTag(String),

    /// A tag name is empty
    #[error("Tag names must not be empty")]
    EmptyTag,

    /// Tick rate is zero, negative or not finite
    #[error("Invalid tick rate: {0}")]
    InvalidTickRate(f32),

    /// Solver needs at least one velocity iteration
    #[error("Velocity iterations must be at least 1")]
    InvalidIterations,

    /// A numeric setting is out of range
    #[error("Invalid value for {name}: {value}")]
    InvalidParameter {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: f32,
    },
}
