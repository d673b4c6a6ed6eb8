//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes error messages, status updates, and document captions.

pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Type /help for the list of commands.";
pub const QUIZ_USAGE: &str = "Usage: /quiz <QuizBot link or start parameter>";
pub const PROCESSING: &str = "⏳ Extracting quiz data, this can take a moment...";

pub fn extraction_failed(err: &str) -> String {
    format!("❌ Could not extract the quiz: {err}")
}

pub fn invalid_link(err: &str) -> String {
    format!("⚠️ That does not look like a QuizBot link: {err}")
}

pub fn document_caption(title: &str, questions: usize) -> String {
    format!("📝 {title} ({questions} questions)")
}

pub const RAW_CAPTION: &str = "📝 Decoded quiz data";
