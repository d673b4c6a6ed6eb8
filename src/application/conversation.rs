//! # Scripted Conversation
//!
//! Drives an automated user account through a quiz run with the quiz bot and
//! collects every question, its options and the answer the bot reveals.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::application::transcript::{
    extract_correct_option, extract_title, is_finished, question_from_message,
};
use crate::domain::config::ExtractionConfig;
use crate::domain::traits::{BotConversation, ConversationFactory, QuizSource};
use crate::domain::types::Quiz;

pub struct ScriptedExtractor<F: ConversationFactory> {
    factory: F,
    bot_username: String,
    max_questions: usize,
    response_timeout: Duration,
    question_timeout: Duration,
}

impl<F: ConversationFactory> ScriptedExtractor<F> {
    pub fn new(factory: F, bot_username: impl Into<String>, settings: &ExtractionConfig) -> Self {
        Self {
            factory,
            bot_username: bot_username.into(),
            max_questions: settings.max_questions,
            response_timeout: settings.response_timeout(),
            question_timeout: settings.question_timeout(),
        }
    }

    async fn run(&self, start_param: &str) -> Result<Quiz> {
        tracing::info!("Extracting quiz data for parameter: {}", start_param);

        let mut conv = self
            .factory
            .open(&self.bot_username)
            .await
            .with_context(|| format!("Failed to open conversation with @{}", self.bot_username))?;

        conv.send(&format!("/start {start_param}")).await?;
        let intro = conv
            .next_message(self.response_timeout)
            .await
            .context("No response from QuizBot")?;

        let mut quiz = Quiz::new(extract_title(&intro.text));
        conv.send("/play").await?;

        while quiz.question_count() < self.max_questions {
            match self.scrape_question(&mut conv, &mut quiz).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    tracing::warn!(
                        "Error processing question {}: {:#}",
                        quiz.question_count() + 1,
                        e
                    );
                    break;
                }
            }
        }

        tracing::info!(
            "Scraped {} questions for quiz '{}'",
            quiz.question_count(),
            quiz.title
        );
        Ok(quiz)
    }

    /// Reads one question and its result. `Ok(false)` ends the run.
    async fn scrape_question(
        &self,
        conv: &mut F::Conversation,
        quiz: &mut Quiz,
    ) -> Result<bool> {
        let message = conv.next_message(self.question_timeout).await?;
        if is_finished(&message.text) {
            return Ok(false);
        }
        if !message.has_buttons() {
            tracing::debug!("Stopping at message without answer buttons: {}", message.text);
            return Ok(false);
        }

        let mut question = question_from_message(&message);

        // Any answer reveals the correct one.
        conv.click(message.id, 0).await?;
        let result = conv.next_message(self.question_timeout).await?;

        if let Some(index) = extract_correct_option(&result.text, &question.options) {
            question.mark_correct(index);
        }
        quiz.questions.push(question);

        if is_finished(&result.text) {
            return Ok(false);
        }
        if result.has_buttons() {
            conv.click(result.id, 0).await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl<F: ConversationFactory> QuizSource for ScriptedExtractor<F> {
    async fn fetch(&self, start_param: &str) -> Result<Option<Quiz>> {
        let quiz = self.run(start_param).await?;
        Ok((!quiz.is_empty()).then_some(quiz))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::traits::{BotMessage, ConversationError};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays a fixed list of bot messages and records what was sent.
    #[derive(Clone, Default)]
    pub(crate) struct ReplayFactory {
        pub script: Arc<Mutex<VecDeque<BotMessage>>>,
        pub sent: Arc<Mutex<Vec<String>>>,
        pub clicks: Arc<Mutex<Vec<(i64, usize)>>>,
    }

    impl ReplayFactory {
        pub fn new(script: Vec<BotMessage>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                ..Default::default()
            }
        }
    }

    pub(crate) struct ReplayConversation(ReplayFactory);

    #[async_trait]
    impl BotConversation for ReplayConversation {
        async fn send(&mut self, text: &str) -> Result<(), ConversationError> {
            self.0.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn next_message(&mut self, timeout: Duration) -> Result<BotMessage, ConversationError> {
            self.0
                .script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ConversationError::Timeout(timeout))
        }

        async fn click(&mut self, message_id: i64, button: usize) -> Result<(), ConversationError> {
            self.0.clicks.lock().unwrap().push((message_id, button));
            Ok(())
        }
    }

    #[async_trait]
    impl ConversationFactory for ReplayFactory {
        type Conversation = ReplayConversation;

        async fn open(&self, _bot: &str) -> Result<ReplayConversation, ConversationError> {
            Ok(ReplayConversation(self.clone()))
        }
    }

    pub(crate) fn msg(id: i64, text: &str, buttons: &[&str]) -> BotMessage {
        BotMessage {
            id,
            text: text.to_string(),
            buttons: if buttons.is_empty() {
                Vec::new()
            } else {
                vec![buttons.iter().map(|b| b.to_string()).collect()]
            },
        }
    }

    pub(crate) fn capitals_script() -> Vec<BotMessage> {
        vec![
            msg(1, "Get ready for the quiz 'Capitals'", &["Start"]),
            msg(2, "Capital of France?", &["Lyon", "Paris"]),
            msg(3, "❌ Lyon\nParis ✅", &["Next"]),
            msg(4, "Capital of Peru?", &["Lima", "Cusco"]),
            msg(5, "Lima ✅", &["Next"]),
            msg(6, "🏁 Quiz finished! Your result: 1/2", &[]),
        ]
    }

    fn settings() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    #[tokio::test]
    async fn test_full_scripted_run() {
        let factory = ReplayFactory::new(capitals_script());
        let extractor = ScriptedExtractor::new(factory.clone(), "QuizBot", &settings());

        let quiz = extractor.fetch("abc123").await.unwrap().unwrap();
        assert_eq!(quiz.title, "Capitals");
        assert_eq!(quiz.question_count(), 2);
        assert_eq!(quiz.questions[0].correct_index(), Some(1));
        assert_eq!(quiz.questions[1].correct_index(), Some(0));

        let sent = factory.sent.lock().unwrap().clone();
        assert_eq!(sent, ["/start abc123", "/play"]);
        let clicks = factory.clicks.lock().unwrap().clone();
        assert_eq!(clicks, [(2, 0), (3, 0), (4, 0), (5, 0)]);
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_quiz() {
        let mut script = capitals_script();
        script.truncate(4);
        let extractor = ScriptedExtractor::new(ReplayFactory::new(script), "QuizBot", &settings());

        let quiz = extractor.fetch("abc").await.unwrap().unwrap();
        assert_eq!(quiz.question_count(), 1);
    }

    #[tokio::test]
    async fn test_max_questions_limit() {
        let mut config = settings();
        config.max_questions = 1;
        let extractor = ScriptedExtractor::new(ReplayFactory::new(capitals_script()), "QuizBot", &config);

        let quiz = extractor.fetch("abc").await.unwrap().unwrap();
        assert_eq!(quiz.question_count(), 1);
    }

    #[tokio::test]
    async fn test_no_response_is_error() {
        let extractor = ScriptedExtractor::new(ReplayFactory::new(Vec::new()), "QuizBot", &settings());
        assert!(extractor.fetch("abc").await.is_err());
    }

    #[tokio::test]
    async fn test_no_questions_yields_none() {
        let script = vec![
            msg(1, "Get ready for the quiz 'Empty'", &[]),
            msg(2, "Quiz finished", &[]),
        ];
        let extractor = ScriptedExtractor::new(ReplayFactory::new(script), "QuizBot", &settings());
        assert!(extractor.fetch("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_message_without_buttons_ends_run() {
        let script = vec![
            msg(1, "Get ready for the quiz 'Capitals'", &["Start"]),
            msg(2, "Capital of France?", &["Lyon", "Paris"]),
            msg(3, "Paris ✅", &["Next"]),
            msg(4, "Thanks for playing", &[]),
            msg(5, "Capital of Peru?", &["Lima", "Cusco"]),
            msg(6, "Lima ✅", &["Next"]),
        ];
        let factory = ReplayFactory::new(script);
        let extractor = ScriptedExtractor::new(factory.clone(), "QuizBot", &settings());

        let quiz = extractor.fetch("abc").await.unwrap().unwrap();
        assert_eq!(quiz.question_count(), 1);
        assert_eq!(factory.script.lock().unwrap().len(), 2);
    }
}
