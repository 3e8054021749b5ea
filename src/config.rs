use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Top-level configuration, persisted as TOML at `~/.vitalcoach/config.toml`.
///
/// Every value has a working default so the pipeline runs without a config
/// file; the file is created on first load so users can edit it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub rag: RagConfig,
}

/// Ollama connection and model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub host: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "qwen3:4b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: 0.2,
            request_timeout_secs: 120,
        }
    }
}

/// Forecast service settings and the fallback coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub timezone: String,
    /// Default coordinate (Las Vegas) used when the caller supplies none
    pub default_latitude: f64,
    pub default_longitude: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.open-meteo.com/v1/forecast".to_string(),
            timeout_secs: 10,
            timezone: "America/Los_Angeles".to_string(),
            default_latitude: 36.1699,
            default_longitude: -115.1398,
        }
    }
}

/// Vitals classification bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    pub heart_rate_min: f64,
    pub heart_rate_max: f64,
    pub sleep_min: f64,
    pub sleep_max: f64,
    pub activity_steps: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heart_rate_min: 60.0,
            heart_rate_max: 100.0,
            sleep_min: 7.0,
            sleep_max: 9.0,
            activity_steps: 10_000,
        }
    }
}

/// Knowledge index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub qdrant_url: String,
    pub collection: String,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_dim: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            qdrant_url: "http://localhost:6334".to_string(),
            collection: "health_knowledge".to_string(),
            top_k: 3,
            chunk_size: 1000,
            chunk_overlap: 100,
            embedding_dim: 768,
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// `OLLAMA_HOST` in the environment overrides the configured host.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;

            toml::from_str(&contents).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.is_empty() {
                config.llm.host = host;
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".vitalcoach").join("config.toml"))
    }
}
