//! # Domain Traits
//!
//! Abstract interfaces for the chat front end and the live QuizBot scraper.
//! Allows for pluggable implementations in the Infrastructure layer.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::types::Quiz;

/// Abstract interface for a Chat Provider (e.g., Telegram Bot API, Console)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a text message to the chat, returning the message id
    async fn send_message(&self, content: &str) -> Result<String, String>;

    /// Send an in-memory file as a document attachment
    async fn send_document(
        &self,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<(), String>;

    /// Get the current chat ID
    fn chat_id(&self) -> String;
}

/// A live source of quiz data, keyed by start parameter.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// `Ok(None)` means the source answered but had nothing to offer.
    async fn fetch(&self, start_param: &str) -> anyhow::Result<Option<Quiz>>;
}

/// A message rendered by the quiz bot, as seen by the scraping account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotMessage {
    pub id: i64,
    pub text: String,
    /// Inline keyboard rows, labels only.
    pub buttons: Vec<Vec<String>>,
}

impl BotMessage {
    pub fn has_buttons(&self) -> bool {
        self.buttons.iter().any(|row| !row.is_empty())
    }
}

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("timed out after {0:?} waiting for the bot")]
    Timeout(Duration),

    #[error("conversation closed by the remote side")]
    Closed,

    #[error("button {index} does not exist on message {message_id}")]
    NoSuchButton { message_id: i64, index: usize },

    #[error("transport error: {0}")]
    Transport(String),
}

/// One scripted exchange with a bot, driven by an automated user account.
#[async_trait]
pub trait BotConversation: Send {
    async fn send(&mut self, text: &str) -> Result<(), ConversationError>;

    /// Waits for the next message from the bot.
    async fn next_message(&mut self, timeout: Duration) -> Result<BotMessage, ConversationError>;

    async fn click(&mut self, message_id: i64, button: usize) -> Result<(), ConversationError>;
}

/// Opens conversations with a bot by username.
#[async_trait]
pub trait ConversationFactory: Send + Sync {
    type Conversation: BotConversation;

    async fn open(&self, bot_username: &str) -> Result<Self::Conversation, ConversationError>;
}
