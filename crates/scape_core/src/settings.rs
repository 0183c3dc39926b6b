//! Engine settings loaded from disk.
//!
//! Settings files are TOML or RON, picked by extension. Hosts usually load
//! once at startup and pass the result to [`EngineContext::new`].
//!
//! [`EngineContext::new`]: crate::EngineContext::new

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
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

/// Configuration trait: serde round-tripping through TOML or RON files.
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Load configuration from file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            Some("ron") => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Some("ron") => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        };
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Defaults applied when a host creates scenes without naming them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSettings {
    /// Name given to a default scene
    pub default_scene_name: String,
    /// Index given to a default scene
    pub default_scene_index: i32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            default_scene_name: "Scene".to_string(),
            default_scene_index: 0,
        }
    }
}

/// Streaming parameters for the serialization subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializationSettings {
    /// Buffer size used for file and gzip streaming
    pub gzip_buffer_size: usize,
    /// File extension for plain binary payloads
    pub binary_extension: String,
    /// File extension for compressed binary payloads
    pub compressed_extension: String,
}

impl Default for SerializationSettings {
    fn default() -> Self {
        Self {
            gzip_buffer_size: 64 * 1024,
            binary_extension: ".sc.bin".to_string(),
            compressed_extension: ".sc.bin.gz".to_string(),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Scene creation defaults
    pub scene: SceneSettings,
    /// Serialization streaming parameters
    pub serialization: SerializationSettings,
}

impl Config for EngineSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let settings = EngineSettings::default();
        assert_eq!(settings.scene.default_scene_name, "Scene");
        assert_eq!(settings.serialization.gzip_buffer_size, 64 * 1024);
        assert!(settings.serialization.compressed_extension.ends_with(".gz"));
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = EngineSettings::default();
        settings.scene.default_scene_name = "overworld".to_string();
        settings.save_to_file(&path).unwrap();

        let loaded = EngineSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded.scene.default_scene_name, "overworld");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = EngineSettings::load_from_file("settings.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_) | ConfigError::Io(_)));
    }
}
