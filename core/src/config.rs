//! Configuration management for Spyglass Mail
//!
//! A TOML file with three sections, overlaid with `SPYGLASS_MAIL_*`
//! environment variables and validated before use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SpyglassError, SpyglassResult};
use crate::sync::engine::SyncOptions;
use crate::sync::CursorPolicy;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyglassConfig {
    /// Application settings
    pub app: AppSection,
    /// Sync loop settings
    pub sync: SyncSection,
    /// Graph endpoint settings
    pub graph: GraphSection,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Azure app registration id. Empty means "read the
    /// `SPYGLASS_CLIENT_ID` environment variable at startup".
    pub client_id: String,
    /// Webmail URL opened by the open-web hand-off
    pub webmail_url: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            webmail_url: crate::WEBMAIL_URL.to_string(),
        }
    }
}

/// Sync loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Seconds between incremental polls
    pub poll_interval_secs: u64,
    /// Messages fetched by the initial load (1..=100)
    pub initial_page_size: usize,
    /// Events fetched for the calendar peek
    pub calendar_events: usize,
    /// Cursor advancement policy
    pub cursor_policy: CursorPolicy,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: crate::DEFAULT_POLL_INTERVAL_SECS,
            initial_page_size: crate::DEFAULT_INBOX_PAGE_SIZE,
            calendar_events: crate::DEFAULT_CALENDAR_EVENTS,
            cursor_policy: CursorPolicy::default(),
        }
    }
}

impl SyncSection {
    /// Poll period as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Engine options carrying this section's tuning
    pub fn options(&self) -> SyncOptions {
        SyncOptions {
            cursor_policy: self.cursor_policy,
            initial_page_size: self.initial_page_size,
            calendar_events: self.calendar_events,
        }
    }
}

/// Graph endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    /// Service root URL
    pub base_url: String,
    /// OAuth scopes requested by the token provider
    pub scopes: Vec<String>,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            base_url: crate::graph::GRAPH_BASE_URL.to_string(),
            scopes: crate::GRAPH_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SpyglassConfig {
    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist
    pub fn load(config_path: &Path) -> SpyglassResult<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: SpyglassConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(SpyglassConfig::default())
        }
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, config_path: &Path) -> SpyglassResult<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Load from the default config path with environment overrides applied
    pub fn load_or_default() -> SpyglassResult<Self> {
        let path = crate::get_config_dir()?.join("config.toml");
        let mut config = Self::load(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay `SPYGLASS_MAIL_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = std::env::var("SPYGLASS_MAIL_CLIENT_ID") {
            self.app.client_id = client_id;
        }

        if let Ok(webmail_url) = std::env::var("SPYGLASS_MAIL_WEBMAIL_URL") {
            self.app.webmail_url = webmail_url;
        }

        if let Ok(interval) = std::env::var("SPYGLASS_MAIL_POLL_INTERVAL_SECS") {
            if let Ok(secs) = interval.parse() {
                self.sync.poll_interval_secs = secs;
            }
        }

        if let Ok(page_size) = std::env::var("SPYGLASS_MAIL_INITIAL_PAGE_SIZE") {
            if let Ok(size) = page_size.parse() {
                self.sync.initial_page_size = size;
            }
        }

        if let Ok(events) = std::env::var("SPYGLASS_MAIL_CALENDAR_EVENTS") {
            if let Ok(count) = events.parse() {
                self.sync.calendar_events = count;
            }
        }

        if let Ok(policy) = std::env::var("SPYGLASS_MAIL_CURSOR_POLICY") {
            match policy.to_lowercase().as_str() {
                "wall-clock" => self.sync.cursor_policy = CursorPolicy::WallClock,
                "newest-message" => self.sync.cursor_policy = CursorPolicy::NewestMessage,
                _ => {}
            }
        }

        if let Ok(base_url) = std::env::var("SPYGLASS_MAIL_GRAPH_BASE_URL") {
            self.graph.base_url = base_url;
        }
    }

    /// Effective client id: the configured value, otherwise the
    /// `SPYGLASS_CLIENT_ID` user environment variable
    pub fn client_id(&self) -> Option<String> {
        if !self.app.client_id.is_empty() {
            return Some(self.app.client_id.clone());
        }
        std::env::var(crate::CLIENT_ID_ENV_VAR).ok().filter(|v| !v.is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> SpyglassResult<()> {
        if self.sync.poll_interval_secs == 0 {
            return Err(SpyglassError::config("poll interval must be at least 1 second"));
        }

        if self.sync.initial_page_size == 0 || self.sync.initial_page_size > 100 {
            return Err(SpyglassError::config(
                "initial page size must be between 1 and 100",
            ));
        }

        if self.sync.calendar_events == 0 {
            return Err(SpyglassError::config("calendar peek needs at least 1 event"));
        }

        if url::Url::parse(&self.graph.base_url).is_err() {
            return Err(SpyglassError::config(format!(
                "invalid Graph base URL: {}",
                self.graph.base_url
            )));
        }

        if url::Url::parse(&self.app.webmail_url).is_err() {
            return Err(SpyglassError::config(format!(
                "invalid webmail URL: {}",
                self.app.webmail_url
            )));
        }

        Ok(())
    }

    /// Default config file path inside the config directory
    pub fn default_path() -> SpyglassResult<PathBuf> {
        Ok(crate::get_config_dir()?.join("config.toml"))
    }
}
