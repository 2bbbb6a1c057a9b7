//! Configuration system
//!
//! Configuration types derive serde and load from `.toml` or `.ron` files
//! through the [`Config`] trait.

pub use serde::{Deserialize, Serialize};

use crate::render::atlas::AtlasConfig;
use crate::render::instancing::ChannelDescriptor;
use crate::render::scene::SpritePass;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(path, &contents)?;
        log::info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Parse `contents` in the format implied by `path`'s extension
    fn parse(path: &str, contents: &str) -> Result<Self, ConfigError> {
        match Format::from_path(path)? {
            Format::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Load from `path`, or fall back to defaults if the file does not exist
    fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        if std::path::Path::new(path).exists() {
            Self::load_from_file(path)
        } else {
            log::warn!("Configuration file {} not found; using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = match Format::from_path(path)? {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn from_path(path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            Ok(Self::Toml)
        } else if path.ends_with(".ron") {
            Ok(Self::Ron)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
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
}

/// Sprite engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slots allocated before the first growth
    pub initial_capacity: usize,
    /// Instanced channels of the sprite pass
    pub channels: Vec<ChannelDescriptor>,
    /// Sprite sheet layout
    pub atlas: AtlasConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8,
            channels: SpritePass::default_channels(),
            atlas: AtlasConfig::default(),
        }
    }
}

impl Config for EngineConfig {}
