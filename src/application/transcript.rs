//! # Transcript Parsing
//!
//! Reads the messages the quiz bot renders during a scripted run: the intro with the
//! quiz title, question messages with answer buttons, and result messages marking
//! the correct answer.

use regex::Regex;
use std::sync::LazyLock;

use crate::application::formatter::CORRECT_MARK;
use crate::domain::traits::BotMessage;
use crate::domain::types::{Question, Quiz, QuizOption};

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Get ready for the quiz\s*['"“‘«](.+?)['"”’»]"#).expect("valid regex")
});

const TITLE_STOPWORDS: [&str; 4] = ["answer", "question", "option", "quiz"];

const FINISHED_MARKERS: [&str; 3] = ["quiz finished", "your result", "quiz is over"];

pub fn extract_title(text: &str) -> String {
    if let Some(title) = TITLE.captures(text).and_then(|caps| caps.get(1)) {
        return title.as_str().trim().to_string();
    }

    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    if !trimmed.is_empty()
        && trimmed.lines().count() <= 2
        && !TITLE_STOPWORDS.iter().any(|w| lower.contains(w))
    {
        return trimmed.lines().next().unwrap_or(trimmed).trim().to_string();
    }

    Quiz::DEFAULT_TITLE.to_string()
}

pub fn is_finished(text: &str) -> bool {
    let lower = text.to_lowercase();
    FINISHED_MARKERS.iter().any(|m| lower.contains(m))
}

/// Index of the option the result message marks with a check mark.
pub fn extract_correct_option(result_text: &str, options: &[QuizOption]) -> Option<usize> {
    options.iter().position(|option| {
        let text = option.text.trim();
        !text.is_empty()
            && (result_text.contains(&format!("{text} {CORRECT_MARK}"))
                || result_text.contains(&format!("{CORRECT_MARK} {text}")))
    })
}

/// A question message: its text plus every button label as an option.
pub fn question_from_message(message: &BotMessage) -> Question {
    let options = message
        .buttons
        .iter()
        .flatten()
        .map(|label| label.trim())
        .filter(|label| !label.is_empty())
        .map(QuizOption::new)
        .collect();

    Question {
        text: message.text.trim().to_string(),
        options,
    }
}
