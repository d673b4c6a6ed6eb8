//! # Start Command
//!
//! Handles a bare `/start`, which Telegram sends when a user first opens the bot.
//! `/start <param>` is routed to the quiz command instead.

use crate::domain::traits::ChatProvider;
use anyhow::Result;

pub async fn handle_start(chat: &impl ChatProvider) -> Result<()> {
    tracing::info!("Welcoming chat {}", chat.chat_id());
    chat.send_message(crate::strings::help::WELCOME)
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}
