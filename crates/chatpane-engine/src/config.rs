//! Client configuration.
//!
//! Configuration is a JSON file (by default `.chatpane/config.json`). Every
//! field has a default, so a partial or missing file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::conversation_store::DEFAULT_PREVIEW_MAX_CHARS;

/// Directory holding config and logs, relative to the working directory.
pub const DATA_DIR: &str = ".chatpane";

/// Config file name inside [`DATA_DIR`].
pub const CONFIG_FILE: &str = "config.json";

/// Main configuration for the chatpane client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Seconds before an unacknowledged send is marked failed.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Maximum characters in a conversation list preview.
    #[serde(default = "default_preview_max_chars")]
    pub preview_max_chars: usize,

    /// TUI tick interval in milliseconds.
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub demo: DemoConfig,
}

fn default_send_timeout_secs() -> u64 {
    10
}

fn default_preview_max_chars() -> usize {
    DEFAULT_PREVIEW_MAX_CHARS
}

fn default_tick_rate_ms() -> u64 {
    100
}

fn default_log_filter() -> String {
    "info".into()
}

/// Icon style for the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IconStyle {
    /// Nerd Font glyphs.
    Nerd,
    /// Standard Unicode symbols.
    #[default]
    Unicode,
    /// ASCII only.
    Ascii,
}

/// Terminal UI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub icons: IconStyle,

    /// Sidebar width as a percentage of the terminal width.
    #[serde(default = "default_sidebar_percent")]
    pub sidebar_percent: u16,
}

fn default_sidebar_percent() -> u16 {
    35
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: IconStyle::default(),
            sidebar_percent: default_sidebar_percent(),
        }
    }
}

impl UiConfig {
    /// Icon style after applying `NO_COLOR`.
    pub fn effective_icons(&self) -> IconStyle {
        if std::env::var_os("NO_COLOR").is_some() {
            IconStyle::Ascii
        } else {
            self.icons
        }
    }
}

/// Settings for the in-memory demo transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Simulated network latency in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Echo every sent message back as an incoming reply.
    #[serde(default = "default_auto_reply")]
    pub auto_reply: bool,
}

fn default_latency_ms() -> u64 {
    300
}

fn default_auto_reply() -> bool {
    true
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            auto_reply: default_auto_reply(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            preview_max_chars: default_preview_max_chars(),
            tick_rate_ms: default_tick_rate_ms(),
            log_filter: default_log_filter(),
            ui: UiConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default config path relative to `root`.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(DATA_DIR).join(CONFIG_FILE)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Load configuration, falling back to defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        std::fs::write(path, content).map_err(ConfigError::Io)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    pub fn demo_latency(&self) -> Duration {
        Duration::from_millis(self.demo.latency_ms)
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.send_timeout_secs, 10);
        assert_eq!(config.preview_max_chars, 40);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.ui.icons, IconStyle::Unicode);
        assert_eq!(config.ui.sidebar_percent, 35);
        assert!(config.demo.auto_reply);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"send_timeout_secs": 3, "ui": {"icons": "ascii"}}"#).unwrap();
        assert_eq!(config.send_timeout(), Duration::from_secs(3));
        assert_eq!(config.ui.icons, IconStyle::Ascii);
        assert_eq!(config.ui.sidebar_percent, 35);
        assert_eq!(config.tick_rate_ms, 100);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = ClientConfig::default_path(dir.path());

        let mut config = ClientConfig::default();
        config.demo.latency_ms = 5;
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_or_default(&dir.path().join("missing.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            ClientConfig::load_or_default(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
