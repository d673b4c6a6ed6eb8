//! # Quiz Formatter
//!
//! Renders quizzes into the plain-text layout sent to users and offered for download:
//!
//! ```text
//! 1. Question text
//! A. First option
//! B. Second option ✅
//! ```

use crate::domain::types::{Question, Quiz};

pub const CORRECT_MARK: &str = "✅";

/// Full rendering with a title/count header.
pub fn format_quiz(quiz: &Quiz) -> String {
    let mut out = format!(
        "Quiz: {}\nQuestions: {}\n\n",
        quiz.title,
        quiz.question_count()
    );
    out.push_str(&format_questions(quiz));
    out
}

/// The question blocks only, separated by blank lines.
pub fn format_questions(quiz: &Quiz) -> String {
    quiz.questions
        .iter()
        .enumerate()
        .map(|(i, q)| format_question(i + 1, q))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_question(number: usize, question: &Question) -> String {
    let mut block = format!("{number}. {}\n", question.text);
    for (j, option) in question.options.iter().enumerate() {
        block.push_str(&format!("{}. {}", option_label(j), option.text));
        if option.correct {
            block.push(' ');
            block.push_str(CORRECT_MARK);
        }
        block.push('\n');
    }
    block
}

/// `A`..`Z`, then plain numbers for very long option lists.
pub fn option_label(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        (index + 1).to_string()
    }
}

/// `quiz_<unix ts>_<param>.txt`, keeping only filename-safe characters of the parameter.
pub fn quiz_file_name(param: &str, timestamp: i64) -> String {
    let safe: String = param
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if safe.is_empty() {
        format!("quiz_{timestamp}.txt")
    } else {
        format!("quiz_{timestamp}_{safe}.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::QuizOption;

    fn sample() -> Quiz {
        let mut quiz = Quiz::new("Capitals");
        quiz.questions.push(Question {
            text: "Capital of France?".to_string(),
            options: vec![QuizOption::correct("Paris"), QuizOption::new("Lyon")],
        });
        quiz.questions.push(Question {
            text: "Capital of Peru?".to_string(),
            options: vec![QuizOption::new("Cusco"), QuizOption::new("Lima")],
        });
        quiz
    }

    #[test]
    fn test_format_quiz() {
        let expected = "Quiz: Capitals\nQuestions: 2\n\n\
                        1. Capital of France?\nA. Paris ✅\nB. Lyon\n\n\
                        2. Capital of Peru?\nA. Cusco\nB. Lima\n";
        assert_eq!(format_quiz(&sample()), expected);
    }

    #[test]
    fn test_empty_quiz_has_header_only() {
        assert_eq!(format_quiz(&Quiz::new("Empty")), "Quiz: Empty\nQuestions: 0\n\n");
    }

    #[test]
    fn test_option_labels() {
        assert_eq!(option_label(0), "A");
        assert_eq!(option_label(25), "Z");
        assert_eq!(option_label(26), "27");
    }

    #[test]
    fn test_quiz_file_name_sanitizes() {
        assert_eq!(quiz_file_name("abc_1-2", 100), "quiz_100_abc_1-2.txt");
        assert_eq!(quiz_file_name("a/b?c", 5), "quiz_5_abc.txt");
        assert_eq!(quiz_file_name("///", 5), "quiz_5.txt");
    }
}
