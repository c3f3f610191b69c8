use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;
use super::state::Permission;

/// How many recently played songs the generator keeps.
pub const ENTRY_BUFFER_SIZE: usize = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Where the watcher polls and how often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 0 disables the timeout.
    #[serde(default)]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Starting permission; a remembered answer in state.json wins over `undetermined`.
    #[serde(default)]
    pub permission: Permission,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Keep at most this many songs on screen. 0 keeps everything.
    #[serde(default)]
    pub max_songs: usize,
}

/// Settings for `caa-generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// The station's "last played" HTML page.
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_true")]
    pub serve: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: 0,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            permission: Permission::default(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            output: default_output(),
            buffer_size: default_buffer_size(),
            serve: default_true(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_feed_url() -> String {
    format!("http://{}:{}/latest.json", default_bind_address(), default_port())
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_source_url() -> String {
    "http://nol888.com/~nlum/caa-radio.php".to_string()
}

fn default_output() -> PathBuf {
    platform::data_dir().join("latest.json")
}

fn default_buffer_size() -> usize {
    ENTRY_BUFFER_SIZE
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feed.url, "http://127.0.0.1:8990/latest.json");
        assert_eq!(config.feed.poll_interval_secs, 30);
        assert_eq!(config.feed.request_timeout_secs, 0);
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.permission, Permission::Undetermined);
        assert_eq!(config.display.max_songs, 0);
        assert_eq!(config.generator.buffer_size, ENTRY_BUFFER_SIZE);
        assert_eq!(config.generator.port, 8990);
        assert!(config.generator.output.ends_with("caa-radio/latest.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [feed]
            url = "https://radio.example/latest.json"

            [notifications]
            permission = "denied"
            "#,
        )
        .unwrap();
        assert_eq!(config.feed.url, "https://radio.example/latest.json");
        assert_eq!(config.feed.poll_interval_secs, 30);
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.permission, Permission::Denied);
        assert_eq!(config.generator.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert_eq!(back.feed.url, config.feed.url);
        assert_eq!(back.generator.output, config.generator.output);
    }
}
