//! Application configuration (~/.devflow/config.toml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_ASSISTANT_URL: &str = "DEVFLOW_ASSISTANT_URL";
pub const ENV_ASSISTANT_TIMEOUT: &str = "DEVFLOW_ASSISTANT_TIMEOUT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub assistant: AssistantSection,
    #[serde(default)]
    pub watcher: WatcherSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantSection {
    #[serde(default = "default_assistant_url")]
    pub url: String,
    /// Code review endpoint (form-encoded `file_content` + `repo_info`)
    #[serde(default = "default_review_url")]
    pub review_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            url: default_assistant_url(),
            review_url: default_review_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AssistantSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_assistant_url() -> String {
    "http://127.0.0.1:5000/chat".to_string()
}

fn default_review_url() -> String {
    "http://127.0.0.1:5000/".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatcherSection {
    /// notify 事件防抖窗口
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// refresh 队列合并窗口
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            coalesce_ms: default_coalesce_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl WatcherSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn coalesce(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_coalesce_ms() -> u64 {
    250
}

fn default_queue_capacity() -> usize {
    256
}

impl AppConfig {
    /// `~/.devflow/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".devflow").join("config.toml"))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work (a zero timeout fails every request)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assistant.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "assistant.timeout_secs".to_string(),
                "0".to_string(),
            ));
        }
        if self.watcher.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "watcher.queue_capacity".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `DEVFLOW_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var(ENV_ASSISTANT_URL).ok(),
            std::env::var(ENV_ASSISTANT_TIMEOUT).ok(),
        )
    }

    fn apply_overrides(
        &mut self,
        url: Option<String>,
        timeout: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.assistant.url = url;
        }
        if let Some(raw) = timeout {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue(ENV_ASSISTANT_TIMEOUT.to_string(), raw.clone()))?;
            self.assistant.timeout_secs = secs;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.assistant.url, "http://127.0.0.1:5000/chat");
        assert_eq!(config.assistant.review_url, "http://127.0.0.1:5000/");
        assert_eq!(config.assistant.timeout(), Duration::from_secs(30));
        assert_eq!(config.watcher.debounce(), Duration::from_millis(500));
        assert_eq!(config.watcher.coalesce(), Duration::from_millis(250));
        assert_eq!(config.watcher.queue_capacity, 256);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[assistant]
url = "http://assistant.internal/chat"

[watcher]
coalesce_ms = 50
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.assistant.url, "http://assistant.internal/chat");
        assert_eq!(config.assistant.timeout_secs, 30);
        assert_eq!(config.watcher.coalesce_ms, 50);
        assert_eq!(config.watcher.debounce_ms, 500);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[assistant\nurl = 1").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[assistant]\ntimeout_secs = 0\n").unwrap();
        match AppConfig::load(&path) {
            Err(ConfigError::InvalidValue(key, value)) => {
                assert_eq!(key, "assistant.timeout_secs");
                assert_eq!(value, "0");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }

        fs::write(&path, "[watcher]\nqueue_capacity = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidValue(_, _))
        ));

        fs::write(&path, "[assistant]\ntimeout_secs = 3\n").unwrap();
        assert_eq!(AppConfig::load(&path).unwrap().assistant.timeout_secs, 3);
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(Some("http://other/chat".to_string()), Some("5".to_string()))
            .unwrap();
        assert_eq!(config.assistant.url, "http://other/chat");
        assert_eq!(config.assistant.timeout_secs, 5);

        let err = config
            .apply_overrides(None, Some("0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_, _)));
        assert_eq!(config.assistant.timeout_secs, 5);
    }
}
