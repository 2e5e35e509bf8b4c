use crate::defaults::*;
use crate::errors::AoBatchError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_block_length() -> usize {
    AO_BLOCK_LENGTH
}
fn default_screening_threshold() -> f64 {
    SCREENING_THRESHOLD
}
fn default_max_geo_order() -> usize {
    MAX_GEO_DIFF_ORDER
}
fn default_batch_config() -> BatchConfig {
    BatchConfig::default()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Configuration {
    #[serde(default = "default_batch_config")]
    pub batch: BatchConfig,
}

impl Configuration {
    /// Read the configuration file from the working directory. If it does not
    /// exist the default settings are used.
    pub fn new() -> Result<Self, AoBatchError> {
        let config_file_path: &Path = Path::new(CONFIG_FILE_NAME);
        if config_file_path.exists() {
            Self::from_file(config_file_path)
        } else {
            Self::from_str("")
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AoBatchError> {
        let config_string: String = fs::read_to_string(path).map_err(|err| {
            AoBatchError::Config(format!("unable to read {}: {}", path.display(), err))
        })?;
        Self::from_str(&config_string)
    }

    pub fn from_str(config_string: &str) -> Result<Self, AoBatchError> {
        let config: Self =
            toml::from_str(config_string).map_err(|err| AoBatchError::Config(err.to_string()))?;
        config.batch.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, AoBatchError> {
        toml::to_string(self).map_err(|err| AoBatchError::Config(err.to_string()))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BatchConfig {
    #[serde(default = "default_block_length")]
    pub block_length: usize,
    #[serde(default = "default_screening_threshold")]
    pub screening_threshold: f64,
    #[serde(default = "default_max_geo_order")]
    pub max_geo_order: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            block_length: AO_BLOCK_LENGTH,
            screening_threshold: SCREENING_THRESHOLD,
            max_geo_order: MAX_GEO_DIFF_ORDER,
        }
    }
}

impl BatchConfig {
    pub fn with_block_length(block_length: usize) -> Self {
        Self {
            block_length,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AoBatchError> {
        if self.block_length == 0 {
            return Err(AoBatchError::Config(String::from(
                "the block length has to be at least 1",
            )));
        }
        if !(self.screening_threshold >= 0.0) {
            return Err(AoBatchError::Config(format!(
                "the screening threshold has to be non-negative, got {}",
                self.screening_threshold
            )));
        }
        if self.max_geo_order > MAX_GEO_DIFF_ORDER {
            return Err(AoBatchError::Config(format!(
                "geometric derivatives are supported up to order {}, got {}",
                MAX_GEO_DIFF_ORDER, self.max_geo_order
            )));
        }
        Ok(())
    }
}
