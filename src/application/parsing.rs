//! # Parsing Utils
//!
//! Turns decoded start-parameter text into quiz data. Tries JSON, then an embedded
//! JSON object, then delimiter-separated fields, and finally keeps the text as-is.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::domain::types::{Payload, Question, Quiz, QuizOption};

static EMBEDDED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

const DELIMITERS: [char; 4] = ['|', ':', ';', ','];

pub fn parse_payload(text: &str) -> Payload {
    tracing::debug!("Attempting to parse quiz data from: {}", text);

    if let Ok(value) = serde_json::from_str::<Value>(text)
        && (value.is_object() || value.is_array())
    {
        tracing::debug!("Successfully parsed as JSON");
        return payload_from_json(value);
    }

    if let Some(m) = EMBEDDED_JSON.find(text)
        && let Ok(value) = serde_json::from_str::<Value>(m.as_str())
    {
        tracing::debug!("Successfully parsed JSON from pattern match");
        return payload_from_json(value);
    }

    if let Some(quiz) = parse_delimited(text) {
        return Payload::Quiz(quiz);
    }

    if let Ok(bytes) = hex::decode(text.trim())
        && !bytes.is_empty()
        && let Ok(decoded) = String::from_utf8(bytes)
    {
        return Payload::Raw(decoded);
    }

    tracing::debug!("Could not parse structured data, returning as raw");
    Payload::Raw(text.to_string())
}

fn payload_from_json(value: Value) -> Payload {
    match quiz_from_json(&value) {
        Some(quiz) => Payload::Quiz(quiz),
        None => Payload::Json(value),
    }
}

/// `title|question|opt1/opt2|question|opt1/opt2...` with any of the known delimiters.
fn parse_delimited(text: &str) -> Option<Quiz> {
    for delimiter in DELIMITERS {
        if !text.contains(delimiter) {
            continue;
        }
        let parts: Vec<&str> = text.split(delimiter).collect();
        if parts.len() < 2 {
            continue;
        }
        tracing::debug!("Found structured data with delimiter: {}", delimiter);

        let mut quiz = Quiz::new(parts[0].trim());
        for pair in parts[1..].chunks_exact(2) {
            quiz.questions.push(Question {
                text: pair[0].trim().to_string(),
                options: pair[1]
                    .split('/')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(QuizOption::new)
                    .collect(),
            });
        }

        if !quiz.questions.is_empty() {
            return Some(quiz);
        }
    }
    None
}

/// Normalizes the JSON shapes quiz payloads have been seen in.
/// Returns `None` when the value has no question list.
pub fn quiz_from_json(value: &Value) -> Option<Quiz> {
    let obj = value.as_object()?;
    let questions = first_of(obj, &["questions", "items"])?.as_array()?;

    let title = first_str(obj, &["title", "quiz_title", "name"])
        .unwrap_or(Quiz::DEFAULT_TITLE)
        .to_string();
    let mut quiz = Quiz::new(title);
    quiz.author = first_str(obj, &["author"]).map(str::to_string);
    quiz.description = first_str(obj, &["description"]).map(str::to_string);
    quiz.questions = questions.iter().filter_map(question_from_json).collect();
    Some(quiz)
}

fn question_from_json(value: &Value) -> Option<Question> {
    let obj = match value {
        Value::Object(obj) => obj,
        Value::String(text) => {
            return Some(Question {
                text: text.clone(),
                options: Vec::new(),
            });
        }
        _ => return None,
    };

    let text = first_str(obj, &["question", "text", "title", "q"])
        .unwrap_or_default()
        .to_string();

    let options: Vec<QuizOption> = first_of(obj, &["options", "answers"])
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(option_from_json).collect())
        .unwrap_or_default();

    let mut question = Question { text, options };

    if question.correct_index().is_none()
        && let Some(index) = first_of(obj, &["correct_option", "correct_answer"])
            .and_then(|v| correct_index(v, &question.options))
    {
        question.mark_correct(index);
    }

    Some(question)
}

fn option_from_json(value: &Value) -> Option<QuizOption> {
    match value {
        Value::String(text) => Some(QuizOption::new(text.as_str())),
        Value::Number(n) => Some(QuizOption::new(n.to_string())),
        Value::Object(obj) => Some(QuizOption {
            text: first_str(obj, &["text", "option", "answer"])
                .unwrap_or_default()
                .to_string(),
            correct: obj.get("correct").and_then(Value::as_bool).unwrap_or(false),
        }),
        _ => None,
    }
}

/// An index (negative means unknown) or the text of the correct option.
fn correct_index(value: &Value, options: &[QuizOption]) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .filter(|i| *i >= 0)
            .map(|i| i as usize)
            .filter(|i| *i < options.len()),
        Value::String(text) => options.iter().position(|o| o.text == *text),
        _ => None,
    }
}

fn first_of<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_json_quiz() {
        let text = json!({
            "title": "Capitals",
            "author": "geo",
            "questions": [
                {
                    "question": "Capital of France?",
                    "options": [{"text": "Paris", "correct": true}, {"text": "Lyon"}]
                },
                {
                    "text": "Capital of Italy?",
                    "answers": ["Milan", "Rome"],
                    "correct_option": 1
                }
            ]
        })
        .to_string();

        let quiz = parse_payload(&text).into_quiz().unwrap();
        assert_eq!(quiz.title, "Capitals");
        assert_eq!(quiz.author.as_deref(), Some("geo"));
        assert_eq!(quiz.question_count(), 2);
        assert_eq!(quiz.questions[0].correct_index(), Some(0));
        assert_eq!(quiz.questions[1].text, "Capital of Italy?");
        assert_eq!(quiz.questions[1].correct_index(), Some(1));
    }

    #[test]
    fn test_correct_option_by_text_and_unknown() {
        let value = json!({
            "quiz_title": "T",
            "questions": [
                {"q": "A?", "options": ["x", "y"], "correct_answer": "y"},
                {"q": "B?", "options": ["x", "y"], "correct_option": -1}
            ]
        });
        let quiz = quiz_from_json(&value).unwrap();
        assert_eq!(quiz.title, "T");
        assert_eq!(quiz.questions[0].correct_index(), Some(1));
        assert_eq!(quiz.questions[1].correct_index(), None);
    }

    #[test]
    fn test_embedded_json() {
        let text = r#"prefix {"title": "Inner", "questions": []} trailing"#;
        match parse_payload(text) {
            Payload::Quiz(quiz) => {
                assert_eq!(quiz.title, "Inner");
                assert!(quiz.is_empty());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_json_without_questions_is_kept() {
        let payload = parse_payload(r#"{"session": 42}"#);
        assert_eq!(payload, Payload::Json(json!({"session": 42})));
    }

    #[test]
    fn test_delimited_quiz() {
        let quiz = parse_payload("History|Who was first?|Adam / Eve|Year?|1066/1492")
            .into_quiz()
            .unwrap();
        assert_eq!(quiz.title, "History");
        assert_eq!(quiz.question_count(), 2);
        assert_eq!(quiz.questions[0].options.len(), 2);
        assert_eq!(quiz.questions[0].options[1].text, "Eve");
        assert_eq!(quiz.questions[1].correct_index(), None);
    }

    #[test]
    fn test_delimiter_without_pairs_falls_through() {
        // A single split yields a title but no question pair.
        assert_eq!(
            parse_payload("just:text"),
            Payload::Raw("just:text".to_string())
        );
    }

    #[test]
    fn test_hex_and_raw() {
        assert_eq!(parse_payload("6869"), Payload::Raw("hi".to_string()));
        assert_eq!(
            parse_payload("nothing here"),
            Payload::Raw("nothing here".to_string())
        );
    }
}
