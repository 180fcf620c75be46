use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub mpv: MpvConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where the mail/TTS backend lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Forwarded as `?limit=` to the generate and stream endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_chars: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub initial_from: String,
    #[serde(default = "default_initial_title")]
    pub initial_title: String,
    #[serde(default = "default_search_on_startup")]
    pub search_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpvConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

/// User-configurable paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where generated audio files are saved.
    /// Defaults to `~/mailcast-downloads`.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
            limit_chars: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            initial_from: String::new(),
            initial_title: default_initial_title(),
            search_on_startup: default_search_on_startup(),
        }
    }
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_initial_title() -> String {
    "週刊Life is beautiful".to_string()
}

fn default_search_on_startup() -> bool {
    true
}

fn default_volume() -> f32 {
    0.5
}

fn default_downloads_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailcast-downloads")
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
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
        assert_eq!(config.server.base_url, "http://127.0.0.1:3000");
        assert!(config.server.request_timeout_secs.is_none());
        assert_eq!(config.search.max_results, 5);
        assert!(config.search.initial_from.is_empty());
        assert_eq!(config.search.initial_title, "週刊Life is beautiful");
        assert!(config.search.search_on_startup);
        assert!(config.paths.downloads_dir.ends_with("mailcast-downloads"));
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.search.max_results, 5);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nbase_url = \"http://mail.lan:8080\"\nlimit_chars = 400\n\n[search]\nmax_results = 20\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.base_url, "http://mail.lan:8080");
        assert_eq!(config.server.limit_chars, Some(400));
        assert_eq!(config.search.max_results, 20);
        assert_eq!(config.search.initial_title, "週刊Life is beautiful");
        assert!((config.mpv.default_volume - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.server.request_timeout_secs = Some(30);
        config.search.initial_title = String::new();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.request_timeout_secs, Some(30));
        assert!(loaded.search.initial_title.is_empty());
    }
}
