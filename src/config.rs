//! Engine configuration
//!
//! Stored as camelCase JSON. Every key is optional; a missing file means
//! the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    /// Index and search Porter stems alongside exact words
    pub stemming: bool,
    /// Multiplier applied to matches reached through a synonym edge
    pub synonym_weight: f64,
    /// Multiplier applied to matches reached through a stem
    pub stem_weight: f64,
    /// Largest id list sent to SQLite in one statement
    pub max_batch_size: usize,
    /// Treat a query made only of excluded terms as "everything but these"
    pub all_negative_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            synonym_weight: 0.5,
            stem_weight: 0.5,
            max_batch_size: 500,
            all_negative_fallback: true,
        }
    }
}

impl SearchConfig {
    /// Load configuration from a JSON file, falling back to defaults if absent
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No search config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid("maxBatchSize must be positive".into()));
        }
        // SQLite's default bound-parameter limit
        if self.max_batch_size > 32_766 {
            return Err(ConfigError::Invalid(format!(
                "maxBatchSize {} exceeds the SQLite parameter limit",
                self.max_batch_size
            )));
        }
        for (name, weight) in [
            ("synonymWeight", self.synonym_weight),
            ("stemWeight", self.stem_weight),
        ] {
            if !(weight > 0.0 && weight < 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 1, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}
