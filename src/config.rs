//! Configuration for Sendback.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sendback configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for store files, images and logs.
    pub data_dir: PathBuf,
    /// Text transform gateway configuration.
    pub gateway: GatewaySettings,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sendback");

        Self {
            data_dir,
            gateway: GatewaySettings::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/sendback/sendback.yml
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join("sendback").join("sendback.yml");
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./sendback.yml
        let fallback_config = PathBuf::from("sendback.yml");
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn sent_messages_path(&self) -> PathBuf {
        self.data_dir.join("sent_messages.json")
    }

    pub fn received_messages_path(&self) -> PathBuf {
        self.data_dir.join("received_messages.json")
    }

    pub fn friends_path(&self) -> PathBuf {
        self.data_dir.join("friends.json")
    }

    pub fn comments_path(&self) -> PathBuf {
        self.data_dir.join("comments.json")
    }

    /// Key/value file holding the "me" profile.
    pub fn profile_prefs_path(&self) -> PathBuf {
        self.data_dir.join("profile_prefs.json")
    }

    /// Directory holding per-owner profile images and staged temp files.
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Settings for the generative text backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Anthropic API key (or use ANTHROPIC_API_KEY env var).
    pub api_key: Option<String>,
    /// Base URL of the backend.
    pub base_url: String,
    /// Model to use.
    pub model: String,
    /// Maximum tokens to generate per call.
    pub max_tokens: u32,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Language the backend is asked to respond in.
    pub locale: String,
}

impl GatewaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            timeout_secs: 60,
            locale: "English".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway.timeout_secs, 60);
        assert_eq!(config.gateway.locale, "English");
        assert!(config.gateway.api_key.is_none());
    }

    #[test]
    fn test_config_paths() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/test"),
            ..Default::default()
        };

        assert_eq!(config.sent_messages_path(), PathBuf::from("/tmp/test/sent_messages.json"));
        assert_eq!(config.friends_path(), PathBuf::from("/tmp/test/friends.json"));
        assert_eq!(config.images_dir(), PathBuf::from("/tmp/test/images"));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yml");

        let config_content = r#"
data_dir: /custom/path
gateway:
  model: claude-haiku-4
  timeout_secs: 5
  locale: Korean
"#;
        fs::write(&config_path, config_content).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/path"));
        assert_eq!(config.gateway.model, "claude-haiku-4");
        assert_eq!(config.gateway.timeout(), Duration::from_secs(5));
        assert_eq!(config.gateway.locale, "Korean");
        // Unspecified fields keep their defaults
        assert_eq!(config.gateway.max_tokens, 1024);
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
