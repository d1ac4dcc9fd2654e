use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

pub const DEFAULT_BASE_URL: &str = "https://api.etherscan.io";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Etherscan API key; one key covers every chain on the v2 API.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_vars(&mut self) {
        if let Ok(api_key) = std::env::var("ETHERSCAN_API_KEY") {
            if !api_key.trim().is_empty() {
                tracing::debug!("Using ETHERSCAN_API_KEY environment variable");
                self.api_key = api_key;
            }
        }

        if let Ok(base_url) = std::env::var("ETHERSCAN_API_URL") {
            if !base_url.trim().is_empty() {
                tracing::debug!("Using ETHERSCAN_API_URL environment variable");
                self.base_url = base_url;
            }
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<std::path::PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("etherscan-mcp").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# Etherscan MCP Server Configuration File

# Etherscan API key. A single key works for every supported chain through
# the v2 API. Can also be supplied via the ETHERSCAN_API_KEY environment
# variable, which takes precedence over this file.
api_key = ""

# Base URL of the explorer API. Chain selection happens per request via the
# chainid parameter, so this stays the same for all networks.
base_url = "https://api.etherscan.io"

# Request timeout in seconds.
timeout_secs = 30

# Environment variables:
# ETHERSCAN_API_KEY - API key override
# ETHERSCAN_API_URL - base URL override
"#;
        sample_config.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.api_key.is_empty());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str(r#"api_key = "abc123""#).unwrap();
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn test_load_from_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            api_key: "secret".to_string(),
            base_url: "https://api.example.org".to_string(),
            timeout_secs: 5,
        };
        tokio::fs::write(&path, toml::to_string_pretty(&config).unwrap())
            .await
            .unwrap();

        let loaded = Config::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.api_key, "secret");
        assert_eq!(loaded.base_url, "https://api.example.org");
        assert_eq!(loaded.timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_load_missing_file_errors() {
        let loaded = Config::load_from_file("/nonexistent/config.toml").await;
        assert!(loaded.is_err());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }
}
