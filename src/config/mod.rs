pub mod types;

pub use types::{EncodingProfile, QualityPreset};

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main application configuration, persisted as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Concurrent job limit; 0 means auto (processing units minus one).
    pub concurrent_jobs: usize,
    /// Replace existing destination files instead of disambiguating.
    pub overwrite: bool,
    /// Stem suffix used when the destination would collide with the source
    /// or an existing file.
    pub output_suffix: String,
    /// Length of the centered preview window in seconds.
    pub preview_seconds: u32,
    /// Encoder settings for the batch.
    pub profile: EncodingProfile,
    /// Explicit ffmpeg path; exported as FFMPEG_PATH when set.
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe path; exported as FFPROBE_PATH when set.
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            concurrent_jobs: 0,
            overwrite: false,
            output_suffix: "_1x".to_string(),
            preview_seconds: 20,
            profile: EncodingProfile::default(),
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the TOML file, or create a default one.
    pub fn load() -> Self {
        let config_path = Self::config_path();

        if config_path.exists() {
            match Self::load_from_file(&config_path) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config: {}. Using defaults.", e);
                }
            }
        }

        let config = Self::default();
        // Save the default so the user has a file to edit.
        if let Err(e) = config.save() {
            warn!("Failed to save default config: {}", e);
        }
        config
    }

    /// Save configuration to the TOML file.
    pub fn save(&self) -> Result<(), AppError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, toml_string)
            .map_err(|e| AppError::Config(format!("Failed to write config file: {}", e)))?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    fn load_from_file(path: &PathBuf) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file path.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slowback")
            .join("config.toml")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.profile.video_crf > 51 {
            return Err(AppError::Config("video CRF must be between 0 and 51".to_string()));
        }
        if !(32..=512).contains(&self.profile.audio_bitrate_kbps) {
            return Err(AppError::Config(
                "audio bitrate must be between 32 and 512 kbps".to_string(),
            ));
        }
        if self.output_suffix.is_empty() {
            return Err(AppError::Config("output suffix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the effective worker limit: the configured value, or number
    /// of processing units minus one (at least 1) when set to auto.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrent_jobs > 0 {
            return self.concurrent_jobs;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}
