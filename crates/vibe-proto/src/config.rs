use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Spotify application credentials.  Values from the config file can be
/// overridden by `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and
/// `SPOTIFY_REDIRECT_URI` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl SpotifyConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("SPOTIFY_CLIENT_ID") {
            self.client_id = v;
        }
        if let Ok(v) = std::env::var("SPOTIFY_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Ok(v) = std::env::var("SPOTIFY_REDIRECT_URI") {
            self.redirect_uri = v;
        }
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Polling cadence and network retry budget for the display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
    /// Cadence of the connectivity probe against /healthz.
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Base URL of the vibe server the display polls.
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retries: default_max_retries(),
            backoff_step_ms: default_backoff_step_ms(),
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:5000/callback".to_string()
}

fn default_interval_ms() -> u64 {
    3000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_step_ms() -> u64 {
    2000
}

fn default_probe_interval_ms() -> u64 {
    5000
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("no config found, writing defaults to {:?}", config_path);
            let mut config = Self::default();
            config.save()?;
            config.spotify = config.spotify.with_env_overrides();
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.spotify = config.spotify.with_env_overrides();
        Ok(config)
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

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            spotify: SpotifyConfig::default(),
            poll: PollConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}
