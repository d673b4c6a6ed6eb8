//! # Telegram Bot API Adapter
//!
//! A small client for the Telegram Bot API over HTTPS and the `ChatProvider`
//! implementation built on it. Only the calls the bot needs are covered:
//! long-polling for updates, sending text and uploading in-memory documents.

use crate::domain::traits::ChatProvider;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TelegramError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                code: self.error_code,
                description: self
                    .description
                    .unwrap_or_else(|| "no result in response".to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

impl User {
    pub fn display(&self) -> String {
        match &self.username {
            Some(name) => format!("@{name}"),
            None => self.id.to_string(),
        }
    }
}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Clone)]
pub struct BotApi {
    client: Client,
    base_url: String,
}

impl BotApi {
    pub fn new(api_base: &str, token: &str) -> Result<Self, TelegramError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }

    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-polls for new messages starting at `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, TelegramError> {
        let body = GetUpdates {
            offset,
            timeout,
            allowed_updates: ["message"],
        };
        // The HTTP timeout must outlast the long poll.
        let http_timeout = Duration::from_secs(timeout) + Duration::from_secs(10);
        self.call("getUpdates", &body, http_timeout).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        let body = SendMessage {
            chat_id,
            text,
            disable_web_page_preview: true,
        };
        self.call("sendMessage", &body, REQUEST_TIMEOUT).await
    }

    /// Uploads `content` as a document named `file_name`.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<Message, TelegramError> {
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("text/plain")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response: ApiResponse<Message> = self
            .client
            .post(format!("{}/sendDocument", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }
}

/// A single Telegram chat seen through the `ChatProvider` interface.
#[derive(Clone)]
pub struct TelegramChat {
    api: BotApi,
    chat_id: i64,
}

impl TelegramChat {
    pub fn new(api: BotApi, chat_id: i64) -> Self {
        Self { api, chat_id }
    }
}

#[async_trait]
impl ChatProvider for TelegramChat {
    async fn send_message(&self, content: &str) -> Result<String, String> {
        tracing::info!("Bot sending message to {}: {}", self.chat_id, content);
        self.api
            .send_message(self.chat_id, content)
            .await
            .map(|msg| msg.message_id.to_string())
            .map_err(|e| e.to_string())
    }

    async fn send_document(
        &self,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> Result<(), String> {
        self.api
            .send_document(self.chat_id, file_name, content, caption)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    fn chat_id(&self) -> String {
        self.chat_id.to_string()
    }
}
