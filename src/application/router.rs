//! # Command Router
//!
//! Routes incoming messages to the appropriate command handler (in `interface/commands`).
//! It parses the command string (e.g., `/quiz`) and dispatches it with the necessary context.
//! Plain messages are scanned for QuizBot links.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::extractor::QuizExtractor;
use crate::application::link::find_quiz_link;
use crate::application::state::BotState;
use crate::domain::traits::ChatProvider;
use crate::interface::commands;

pub struct CommandRouter {
    extractor: Arc<QuizExtractor>,
    state: Arc<Mutex<BotState>>,
    state_path: PathBuf,
}

impl CommandRouter {
    pub fn new(
        extractor: Arc<QuizExtractor>,
        state: Arc<Mutex<BotState>>,
        state_path: PathBuf,
    ) -> Self {
        Self {
            extractor,
            state,
            state_path,
        }
    }

    pub async fn route<C>(&self, chat: &C, message: &str, sender: &str) -> Result<()>
    where
        C: ChatProvider,
    {
        let msg = message.trim();
        if msg.is_empty() {
            return Ok(());
        }

        let (cmd, args) = match msg.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (msg, ""),
        };
        // Group chats address commands as `/quiz@OurBot`.
        let cmd = cmd.split('@').next().unwrap_or(cmd);

        tracing::info!(
            "Router dispatching cmd='{}' args='{}' sender='{}'",
            cmd,
            args,
            sender
        );

        match cmd {
            "/start" if args.is_empty() => commands::start::handle_start(chat).await?,
            "/start" | "/quiz" if !args.is_empty() => {
                let delivered = commands::quiz::handle_quiz(&self.extractor, chat, args).await?;
                self.record(chat, delivered).await;
            }
            "/quiz" => {
                chat.send_message(crate::strings::messages::QUIZ_USAGE)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            "/help" => commands::help::handle_help(chat).await?,
            _ if cmd.starts_with('/') => {
                chat.send_message(crate::strings::messages::UNKNOWN_COMMAND)
                    .await
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            _ => match find_quiz_link(msg, self.extractor.quiz_bot()) {
                Some(param) => {
                    let delivered =
                        commands::quiz::handle_param(&self.extractor, chat, &param).await?;
                    self.record(chat, delivered).await;
                }
                None => tracing::debug!("Ignoring plain message from {}", sender),
            },
        }

        Ok(())
    }

    async fn record<C: ChatProvider>(&self, chat: &C, delivered: Option<String>) {
        if let Some(quiz_id) = delivered {
            let mut guard = self.state.lock().await;
            guard.record_extraction(&chat.chat_id(), &quiz_id);
            guard.save(&self.state_path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ExtractionConfig;
    use crate::infrastructure::storage::QuizStore;
    use crate::strings::{help, messages};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    const JSON_PARAM: &str = "eyJ0aXRsZSI6IkNhcGl0YWxzIiwicXVlc3Rpb25zIjpbeyJxdWVzdGlvbiI6IkNhcGl0YWwgb2YgRnJhbmNlPyIsIm9wdGlvbnMiOlsiTHlvbiIsIlBhcmlzIl0sImNvcnJlY3Rfb3B0aW9uIjoxfV19";

    /// Records everything the router sends.
    #[derive(Clone, Default)]
    struct MockChat {
        pub messages: Arc<StdMutex<Vec<String>>>,
        pub documents: Arc<StdMutex<Vec<(String, String, String)>>>,
    }

    #[async_trait]
    impl ChatProvider for MockChat {
        async fn send_message(&self, content: &str) -> Result<String, String> {
            let mut messages = self.messages.lock().unwrap();
            messages.push(content.to_string());
            Ok(messages.len().to_string())
        }

        async fn send_document(
            &self,
            file_name: &str,
            content: Vec<u8>,
            caption: &str,
        ) -> Result<(), String> {
            let body = String::from_utf8(content).map_err(|e| e.to_string())?;
            self.documents
                .lock()
                .unwrap()
                .push((file_name.to_string(), body, caption.to_string()));
            Ok(())
        }

        fn chat_id(&self) -> String {
            "42".to_string()
        }
    }

    /// Every send fails, as when the bot was removed from the chat.
    struct ClosedChat;

    #[async_trait]
    impl ChatProvider for ClosedChat {
        async fn send_message(&self, _content: &str) -> Result<String, String> {
            Err("Forbidden: bot was kicked".to_string())
        }

        async fn send_document(
            &self,
            _file_name: &str,
            _content: Vec<u8>,
            _caption: &str,
        ) -> Result<(), String> {
            Err("Forbidden: bot was kicked".to_string())
        }

        fn chat_id(&self) -> String {
            "7".to_string()
        }
    }

    struct Fixture {
        router: CommandRouter,
        state: Arc<Mutex<BotState>>,
        chat: MockChat,
        dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let store = QuizStore::in_memory().await.unwrap();
        let extractor = QuizExtractor::new(store, None, "QuizBot", &ExtractionConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(Mutex::new(BotState::default()));
        let router = CommandRouter::new(
            Arc::new(extractor),
            state.clone(),
            dir.path().join("state.json"),
        );
        Fixture {
            router,
            state,
            chat: MockChat::default(),
            dir,
        }
    }

    #[tokio::test]
    async fn test_help_and_welcome() {
        let f = fixture().await;
        f.router.route(&f.chat, "/help", "user").await.unwrap();
        f.router.route(&f.chat, "/start", "user").await.unwrap();
        let sent = f.chat.messages.lock().unwrap().clone();
        assert_eq!(sent, [help::MAIN, help::WELCOME]);
    }

    #[tokio::test]
    async fn test_usage_unknown_and_plain_text() {
        let f = fixture().await;
        f.router.route(&f.chat, "/quiz", "user").await.unwrap();
        f.router.route(&f.chat, "/frobnicate now", "user").await.unwrap();
        f.router.route(&f.chat, "just chatting", "user").await.unwrap();
        let sent = f.chat.messages.lock().unwrap().clone();
        assert_eq!(sent, [messages::QUIZ_USAGE, messages::UNKNOWN_COMMAND]);
    }

    #[tokio::test]
    async fn test_pasted_link_delivers_document() {
        let f = fixture().await;
        let text = format!("look at this https://t.me/QuizBot?start={JSON_PARAM} !");
        f.router.route(&f.chat, &text, "user").await.unwrap();

        assert_eq!(f.chat.messages.lock().unwrap()[0], messages::PROCESSING);
        let documents = f.chat.documents.lock().unwrap().clone();
        assert_eq!(documents.len(), 1);
        let (name, body, caption) = &documents[0];
        assert!(name.starts_with("quiz_"));
        assert!(name.ends_with(&format!("_{}.txt", &JSON_PARAM[..64])));
        assert_eq!(body, "1. Capital of France?\nA. Lyon\nB. Paris ✅\n");
        assert_eq!(caption, &messages::document_caption("Capitals", 1));

        let state = f.state.lock().await;
        assert_eq!(state.chats["42"].extractions, 1);
        assert!(f.dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_pasted_percent_encoded_link() {
        let f = fixture().await;
        // Same parameter with its first character escaped.
        let text = format!("https://t.me/QuizBot?start=%65{}", &JSON_PARAM[1..]);
        f.router.route(&f.chat, &text, "user").await.unwrap();

        let documents = f.chat.documents.lock().unwrap().clone();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].0.ends_with(&format!("_{}.txt", &JSON_PARAM[..64])));
    }

    #[tokio::test]
    async fn test_addressed_command_and_start_param() {
        let f = fixture().await;
        let text = format!("/start@QuizExtractorBot {JSON_PARAM}");
        f.router.route(&f.chat, &text, "user").await.unwrap();
        assert_eq!(f.chat.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_reported() {
        let f = fixture().await;
        f.router
            .route(&f.chat, "/quiz https://t.me/OtherBot?start=abc", "user")
            .await
            .unwrap();
        f.router.route(&f.chat, "/quiz abc123", "user").await.unwrap();

        let sent = f.chat.messages.lock().unwrap().clone();
        assert_eq!(sent.len(), 4);
        assert!(sent[1].starts_with("⚠️"));
        assert!(sent[3].starts_with("❌"));
        assert!(f.chat.documents.lock().unwrap().is_empty());
        assert!(f.state.lock().await.chats.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_send_failure_propagates() {
        let f = fixture().await;
        let err = f.router.route(&ClosedChat, "/frobnicate", "user").await.unwrap_err();
        assert!(err.to_string().contains("kicked"));
    }
}
