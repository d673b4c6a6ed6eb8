//! # Bot State
//!
//! Defines the persistent state of the bot (`BotState`) and per-chat state (`ChatState`).
//! This is the Telegram polling offset plus a few per-chat counters.
//! It handles serialization and deserialization to/from JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// State for a single chat.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatState {
    #[serde(default)]
    pub extractions: u64,
    #[serde(default)]
    pub last_quiz: Option<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Persistent state of the bot, mapping chat IDs to their respective chat states.
/// Saved to `<data_dir>/state.json`.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
pub struct BotState {
    /// Next `getUpdates` offset, so restarts do not replay old messages.
    #[serde(default)]
    pub update_offset: i64,
    #[serde(default)]
    pub chats: HashMap<String, ChatState>,
}

impl BotState {
    /// Gets or creates the state for a specific chat.
    pub fn get_chat_state(&mut self, chat_id: &str) -> &mut ChatState {
        self.chats.entry(chat_id.to_string()).or_default()
    }

    /// Only ever moves forward.
    pub fn update_offset(&mut self, update_id: i64) {
        self.update_offset = self.update_offset.max(update_id + 1);
    }

    pub fn record_extraction(&mut self, chat_id: &str, quiz_id: &str) {
        let chat = self.get_chat_state(chat_id);
        chat.extractions += 1;
        chat.last_quiz = Some(quiz_id.to_string());
        chat.last_seen = Some(Utc::now());
    }

    /// Loads the state file, or returns the default when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt state file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Persists the current state, creating the parent directory if needed.
    /// Failures are logged; the in-memory state stays authoritative.
    pub async fn save(&self, path: &Path) {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!("Failed to create state directory {}: {}", parent.display(), e);
            return;
        }
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = tokio::fs::write(path, content).await {
                    tracing::warn!("Failed to save state to {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize state: {}", e),
        }
    }
}
