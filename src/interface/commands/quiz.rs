//! # Quiz Command
//!
//! Handles `/quiz <link>`, `/start <param>` and pasted QuizBot links.
//! Sends a processing notice, runs the extraction and delivers the result as a `.txt` document.

use anyhow::{Result, anyhow};
use chrono::Utc;

use crate::application::extractor::QuizExtractor;
use crate::application::formatter::{format_questions, quiz_file_name};
use crate::application::link::resolve_reference;
use crate::domain::traits::ChatProvider;
use crate::domain::types::Payload;
use crate::strings::messages;

/// Handles a link or bare parameter given as a command argument.
/// Returns the quiz id when a document was delivered.
pub async fn handle_quiz(
    extractor: &QuizExtractor,
    chat: &impl ChatProvider,
    reference: &str,
) -> Result<Option<String>> {
    chat.send_message(messages::PROCESSING)
        .await
        .map_err(|e| anyhow!(e))?;

    match resolve_reference(reference, extractor.quiz_bot()) {
        Ok(param) => deliver(extractor, chat, &param).await,
        Err(e) => {
            tracing::warn!("Rejected reference '{}': {}", reference, e);
            chat.send_message(&messages::invalid_link(&e.to_string()))
                .await
                .map_err(|e| anyhow!(e))?;
            Ok(None)
        }
    }
}

/// Handles a start parameter already taken from a link pasted into the chat.
pub async fn handle_param(
    extractor: &QuizExtractor,
    chat: &impl ChatProvider,
    param: &str,
) -> Result<Option<String>> {
    chat.send_message(messages::PROCESSING)
        .await
        .map_err(|e| anyhow!(e))?;
    deliver(extractor, chat, param).await
}

async fn deliver(
    extractor: &QuizExtractor,
    chat: &impl ChatProvider,
    param: &str,
) -> Result<Option<String>> {
    let extraction = match extractor.extract_param(param).await {
        Ok(extraction) => extraction,
        Err(e) => {
            tracing::warn!("Extraction failed for '{}': {}", param, e);
            chat.send_message(&messages::extraction_failed(&e.to_string()))
                .await
                .map_err(|e| anyhow!(e))?;
            return Ok(None);
        }
    };

    let (body, caption) = match &extraction.payload {
        Payload::Quiz(quiz) => (
            format_questions(quiz),
            messages::document_caption(&quiz.title, quiz.question_count()),
        ),
        _ => (extraction.formatted.clone(), messages::RAW_CAPTION.to_string()),
    };
    let file_name = quiz_file_name(&extraction.quiz_id, Utc::now().timestamp());

    tracing::info!(
        "Sending {} to chat {} ({:?})",
        file_name,
        chat.chat_id(),
        extraction.source
    );
    chat.send_document(&file_name, body.into_bytes(), &caption)
        .await
        .map_err(|e| anyhow!(e))?;

    Ok(Some(extraction.quiz_id))
}
