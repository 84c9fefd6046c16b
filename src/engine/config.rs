use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::definitions::{DefinitionError, DefinitionRegistry};
use crate::logging::TracingConfig;
use crate::map::{MapDefinition, MapError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Top-level world configuration. Relative paths resolve against the
/// directory of the config file they were loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    pub map_path: PathBuf,
    pub definitions_path: PathBuf,
    pub tracing: TracingConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            map_path: PathBuf::from("config/map.ron"),
            definitions_path: PathBuf::from("config/definitions.ron"),
            tracing: TracingConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_ron_str(&fs::read_to_string(path)?)?;
        if let Some(base) = path.parent() {
            config.map_path = base.join(&config.map_path);
            config.definitions_path = base.join(&config.definitions_path);
        }
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults. Any other
    /// failure, including a malformed file, is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        ron::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    pub fn load_map(&self) -> Result<MapDefinition, ConfigError> {
        Ok(MapDefinition::from_ron_str(&fs::read_to_string(&self.map_path)?)?)
    }

    pub fn load_definitions(&self) -> Result<DefinitionRegistry, ConfigError> {
        Ok(DefinitionRegistry::from_ron_str(&fs::read_to_string(
            &self.definitions_path,
        )?)?)
    }
}
