//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`)
//! and the environment variables that override it.
//! Every section is optional; a missing file yields the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub userbot: UserbotConfig,
    pub web: WebConfig,
    pub database: DatabaseConfig,
    pub extraction: ExtractionConfig,
    pub system: SystemConfig,
}

/// Bot API settings for the chat front end.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
    /// Long-poll timeout for `getUpdates`, in seconds.
    pub poll_timeout: u64,
    /// Username of the quiz bot whose links we accept.
    pub quiz_bot: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout: 30,
            quiz_bot: "QuizBot".to_string(),
        }
    }
}

/// Credentials of the automated user account that talks to the quiz bot.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct UserbotConfig {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub phone: Option<String>,
    pub session_string: Option<String>,
}

impl UserbotConfig {
    pub fn is_complete(&self) -> bool {
        self.api_id.is_some_and(|id| id != 0)
            && self.api_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Bearer token guarding destructive API routes.
    pub secret_key: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 5000,
            secret_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/quizzes.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Parameters shorter than this are treated as server-side short codes.
    pub short_code_max_len: usize,
    pub max_questions: usize,
    /// Seconds to wait for the bot's first reply.
    pub response_timeout: u64,
    /// Seconds to wait for each question / result message.
    pub question_timeout: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            short_code_max_len: 12,
            max_questions: 100,
            response_timeout: 30,
            question_timeout: 15,
        }
    }
}

impl ExtractionConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout)
    }

    pub fn question_timeout(&self) -> Duration {
        Duration::from_secs(self.question_timeout)
    }
}

/// System-level settings for the process.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SystemConfig {
    pub data_dir: String,
    pub log_file: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_file: "session.log".to_string(),
        }
    }
}

impl SystemConfig {
    pub fn state_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join("state.json")
    }
}

impl AppConfig {
    /// Reads the YAML file if present, then applies environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies overrides from a variable lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(raw) = non_empty("TELEGRAM_API_ID") {
            let cleaned = raw.trim().trim_matches(|c| c == '"' || c == '\'');
            match cleaned.parse::<i32>() {
                Ok(id) => self.userbot.api_id = Some(id),
                Err(_) => {
                    tracing::error!("Invalid TELEGRAM_API_ID - must be a number");
                    self.userbot.api_id = None;
                }
            }
        }
        if let Some(hash) = non_empty("TELEGRAM_API_HASH") {
            self.userbot.api_hash = Some(hash);
        }
        if let Some(phone) = non_empty("TELEGRAM_PHONE") {
            self.userbot.phone = Some(phone);
        }
        if let Some(session) = non_empty("SESSION_STRING") {
            self.userbot.session_string = Some(session);
        }
        if let Some(port) = non_empty("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.web.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value '{}'", port),
            }
        }
        if let Some(secret) = non_empty("SESSION_SECRET") {
            self.web.secret_key = Some(secret);
        }
        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = url;
        }
    }

    pub fn web_addr(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}
