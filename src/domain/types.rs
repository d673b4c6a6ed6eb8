//! # Domain Types
//!
//! Common data structures and enums used across the application logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizOption {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
}

impl QuizOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            correct: false,
        }
    }

    pub fn correct(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            correct: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    #[serde(default)]
    pub options: Vec<QuizOption>,
}

impl Question {
    /// Index of the first option flagged as correct, if the answer is known.
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| o.correct)
    }

    pub fn mark_correct(&mut self, index: usize) {
        for (i, option) in self.options.iter_mut().enumerate() {
            option.correct = i == index;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quiz {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub const DEFAULT_TITLE: &'static str = "Untitled Quiz";

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            description: None,
            questions: Vec::new(),
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// The strategy that turned a start parameter into text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMethod {
    StandardBase64,
    UrlSafeBase64,
    TranslatedBase64,
    PaddedBase64,
    ReversedBase64,
    Hex,
    PercentBytes,
    BinaryHeader,
    Literal,
}

impl DecodeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodeMethod::StandardBase64 => "standard_base64",
            DecodeMethod::UrlSafeBase64 => "url_safe_base64",
            DecodeMethod::TranslatedBase64 => "translated_base64",
            DecodeMethod::PaddedBase64 => "padded_base64",
            DecodeMethod::ReversedBase64 => "reversed_base64",
            DecodeMethod::Hex => "hex",
            DecodeMethod::PercentBytes => "percent_bytes",
            DecodeMethod::BinaryHeader => "binary_header",
            DecodeMethod::Literal => "literal",
        }
    }
}

/// How raw bytes were interpreted as text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Decoded {
    pub method: DecodeMethod,
    pub encoding: TextEncoding,
    pub text: String,
}

/// What a decoded parameter turned out to contain.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Quiz(Quiz),
    Json(Value),
    Raw(String),
}

impl Payload {
    pub fn as_quiz(&self) -> Option<&Quiz> {
        match self {
            Payload::Quiz(quiz) => Some(quiz),
            _ => None,
        }
    }

    pub fn into_quiz(self) -> Option<Quiz> {
        match self {
            Payload::Quiz(quiz) => Some(quiz),
            _ => None,
        }
    }
}
