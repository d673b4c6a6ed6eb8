//! # Quiz Extractor
//!
//! Resolves a quiz reference into formatted quiz data. Lookup order is the local
//! database, then the live QuizBot source (when one is configured), then a local
//! decode of the start parameter itself.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::application::decoder::{DecodeError, decode_quiz_param};
use crate::application::formatter::format_quiz;
use crate::application::link::{LinkError, is_short_code, resolve_reference};
use crate::application::parsing::parse_payload;
use crate::domain::config::ExtractionConfig;
use crate::domain::traits::QuizSource;
use crate::domain::types::{DecodeMethod, Decoded, Payload, Quiz};
use crate::infrastructure::storage::{QuizStore, StoreError};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("'{0}' is a short code; its quiz is only available from QuizBot itself")]
    ShortCode(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Live,
    Decoded,
}

#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub quiz_id: String,
    pub source: Source,
    /// Set only for locally decoded parameters.
    pub method: Option<DecodeMethod>,
    pub payload: Payload,
    pub formatted: String,
}

impl Extraction {
    pub fn quiz(&self) -> Option<&Quiz> {
        self.payload.as_quiz()
    }
}

pub struct QuizExtractor {
    store: QuizStore,
    live: Option<Arc<dyn QuizSource>>,
    quiz_bot: String,
    short_code_max_len: usize,
}

impl QuizExtractor {
    pub fn new(
        store: QuizStore,
        live: Option<Arc<dyn QuizSource>>,
        quiz_bot: impl Into<String>,
        settings: &ExtractionConfig,
    ) -> Self {
        Self {
            store,
            live,
            quiz_bot: quiz_bot.into(),
            short_code_max_len: settings.short_code_max_len,
        }
    }

    pub fn store(&self) -> &QuizStore {
        &self.store
    }

    pub fn quiz_bot(&self) -> &str {
        &self.quiz_bot
    }

    /// Accepts a deep link or a bare start parameter.
    pub async fn extract_url(&self, url: &str) -> Result<Extraction, ExtractError> {
        let param = resolve_reference(url, &self.quiz_bot)?;
        self.extract_param(&param).await
    }

    pub async fn extract_param(&self, param: &str) -> Result<Extraction, ExtractError> {
        let param = param.trim();
        if param.is_empty() {
            return Err(DecodeError::EmptyParameter.into());
        }

        if let Some(record) = self.store.get_quiz(param).await?
            && record.question_count > 0
            && let Some(quiz) = record.quiz()?
        {
            tracing::info!("Serving quiz {} from database", param);
            self.store.touch(param).await?;
            let formatted = record
                .formatted_data
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| format_quiz(&quiz));
            return Ok(Extraction {
                quiz_id: param.to_string(),
                source: Source::Cache,
                method: None,
                payload: Payload::Quiz(quiz),
                formatted,
            });
        }

        if let Some(live) = &self.live {
            match live.fetch(param).await {
                Ok(Some(quiz)) => {
                    let formatted = format_quiz(&quiz);
                    self.store.save_quiz(param, &quiz, &formatted).await?;
                    return Ok(Extraction {
                        quiz_id: param.to_string(),
                        source: Source::Live,
                        method: None,
                        payload: Payload::Quiz(quiz),
                        formatted,
                    });
                }
                Ok(None) => tracing::info!("Live source returned no questions for {}", param),
                Err(e) => tracing::warn!("Live extraction failed for {}: {:#}", param, e),
            }
        }

        let short = is_short_code(param, self.short_code_max_len);
        let decoded = match decode_quiz_param(param) {
            Ok(decoded) => decoded,
            Err(_) if short => return Err(ExtractError::ShortCode(param.to_string())),
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Decoded {} with {}", param, decoded.method.as_str());

        let payload = parse_payload(&decoded.text);
        match &payload {
            Payload::Quiz(quiz) if !quiz.is_empty() => {
                self.store
                    .save_quiz(param, quiz, &format_quiz(quiz))
                    .await?;
            }
            _ if short => return Err(ExtractError::ShortCode(param.to_string())),
            _ => {}
        }

        Ok(Extraction {
            quiz_id: param.to_string(),
            source: Source::Decoded,
            method: Some(decoded.method),
            formatted: render_payload(&payload),
            payload,
        })
    }

    /// Decodes a link without touching the database or the live source.
    pub fn decode_url(&self, url: &str) -> Result<(Decoded, Payload), ExtractError> {
        let param = resolve_reference(url, &self.quiz_bot)?;
        let decoded = decode_quiz_param(&param)?;
        let payload = parse_payload(&decoded.text);
        Ok((decoded, payload))
    }
}

/// Human-readable text for any payload kind.
pub fn render_payload(payload: &Payload) -> String {
    match payload {
        Payload::Quiz(quiz) => format_quiz(quiz),
        Payload::Json(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Payload::Raw(text) => format!("Decoded data:\n{text}\n"),
    }
}
