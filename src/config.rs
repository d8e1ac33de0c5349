use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, WaveformError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Tabular export to decode.
    pub source_path: PathBuf,
    /// Existing directory that receives one CSV per record.
    pub save_dir: PathBuf,
    /// Rows held in memory at once.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Config {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(source_path: P, save_dir: Q) -> Self {
        Self {
            source_path: source_path.into(),
            save_dir: save_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WaveformError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(WaveformError::Config(
                "chunk_size must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}
