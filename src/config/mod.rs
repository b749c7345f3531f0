use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:6689";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_url: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// We support BOTH `API_URL` and the legacy lowercase `api_url`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_url = lookup("API_URL")
            .or_else(|| lookup("api_url"))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self { api_url }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing knobs for the autosave / sync engine. All values are milliseconds on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    pub title_debounce_ms: u64,
    pub content_debounce_ms: u64,
    pub sync_interval_ms: u64,
    pub error_revert_ms: u64,
    pub sync_flash_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            title_debounce_ms: 500,
            content_debounce_ms: 800,
            sync_interval_ms: 3_000,
            error_revert_ms: 5_000,
            sync_flash_ms: 1_000,
        }
    }
}

impl EditorConfig {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn title_debounce(&self) -> Duration {
        Duration::from_millis(self.title_debounce_ms)
    }

    pub fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn error_revert(&self) -> Duration {
        Duration::from_millis(self.error_revert_ms)
    }

    pub fn sync_flash(&self) -> Duration {
        Duration::from_millis(self.sync_flash_ms)
    }
}
