//! LinkKeeper configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main LinkKeeper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Telegram Bot API configuration
    pub telegram: TelegramConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Conversation session configuration
    pub session: SessionConfig,

    /// Feedback forwarding
    pub feedback: FeedbackConfig,
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token; usually supplied through the environment instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Bot API host
    pub api_host: String,

    /// Maximum updates per `getUpdates` call
    pub batch_size: usize,

    /// Long-poll timeout in seconds
    pub poll_timeout_secs: u64,

    /// HTTP request timeout in seconds; must exceed the long-poll timeout
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_host: "api.telegram.org".to_string(),
            batch_size: 100,
            poll_timeout_secs: 30,
            request_timeout_secs: 40,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; the parent directory is created if absent
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/sqlite/data.db"),
        }
    }
}

/// Conversation session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline for processing a single event
    pub event_timeout_secs: u64,

    /// Sessions idle for longer than this are dropped
    pub idle_ttl_secs: u64,

    /// How often idle sessions are swept
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_timeout_secs: 30,
            idle_ttl_secs: 86_400,
            sweep_interval_secs: 600,
        }
    }
}

impl SessionConfig {
    pub fn event_timeout(&self) -> Duration {
        Duration::from_secs(self.event_timeout_secs)
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Feedback forwarding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Chat that receives `/feedback` messages
    pub admin_chat_id: Option<i64>,
}

impl BotConfig {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Reject values the bot can't run with
    pub fn validate(&self) -> Result<()> {
        if self.token().is_none() {
            return Err(Error::Config(
                "bot token is not specified (--token or LINKKEEPER_BOT_TOKEN)".to_string(),
            ));
        }
        if self.telegram.batch_size == 0 || self.telegram.batch_size > 100 {
            return Err(Error::Config(format!(
                "telegram.batch_size must be within 1..=100, got {}",
                self.telegram.batch_size
            )));
        }
        if self.telegram.request_timeout_secs <= self.telegram.poll_timeout_secs {
            return Err(Error::Config(
                "telegram.request_timeout_secs must exceed telegram.poll_timeout_secs".to_string(),
            ));
        }
        if self.session.event_timeout_secs == 0 || self.session.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "session timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Non-empty bot token
    pub fn token(&self) -> Option<&str> {
        self.telegram
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.telegram.token.is_some() {
            config.telegram.token = Some("<redacted>".to_string());
        }
        config
    }
}
