//! HTML pages: the landing page with recent quizzes and the extraction form.

use axum::extract::Form;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use serde::Deserialize;

use super::WebContext;
use crate::application::extractor::Extraction;
use crate::infrastructure::storage::QuizRecord;
use crate::strings::templates::{self, escape_html, page, render};

const RECENT_ON_INDEX: i64 = 10;

pub(crate) fn create_router() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/extract", get(extract_form).post(extract_submit))
}

async fn health() -> &'static str {
    "OK"
}

async fn index(Extension(ctx): Extension<WebContext>) -> Response {
    let recent = match ctx.extractor.store().recent(RECENT_ON_INDEX).await {
        Ok(records) => recent_table(&records),
        Err(e) => {
            tracing::error!("Failed to load recent quizzes: {}", e);
            "<p class=\"error\">Recent quizzes are unavailable.</p>".to_string()
        }
    };
    let body = render(templates::INDEX, &[("recent", &recent)]);
    Html(page("Home", &body)).into_response()
}

fn recent_table(records: &[QuizRecord]) -> String {
    if records.is_empty() {
        return "<p>No quizzes extracted yet.</p>".to_string();
    }
    let rows: String = records
        .iter()
        .map(|r| {
            let id = escape_html(&r.quiz_id);
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td>\
                 <td><a href=\"/api/quizzes/{id}/download?format=txt\">txt</a></td></tr>\n",
                escape_html(r.title.as_deref().unwrap_or("Untitled Quiz")),
                r.question_count,
                r.access_count,
            )
        })
        .collect();
    format!(
        "<table>\n<tr><th>Title</th><th>Questions</th><th>Views</th><th></th></tr>\n{rows}</table>"
    )
}

async fn extract_form() -> Html<String> {
    let body = render(templates::EXTRACT, &[("url", ""), ("result", "")]);
    Html(page("Extract", &body))
}

#[derive(Debug, Deserialize)]
struct ExtractForm {
    url: String,
}

async fn extract_submit(
    Extension(ctx): Extension<WebContext>,
    Form(form): Form<ExtractForm>,
) -> Response {
    match ctx.extractor.extract_url(&form.url).await {
        Ok(extraction) => {
            let result = quiz_section(&extraction);
            let body = render(
                templates::EXTRACT,
                &[("url", &escape_html(form.url.trim())), ("result", &result)],
            );
            Html(page("Extract", &body)).into_response()
        }
        Err(e) => {
            tracing::warn!("Web extraction failed for '{}': {}", form.url, e);
            (StatusCode::BAD_REQUEST, format!("Error: {e}")).into_response()
        }
    }
}

fn quiz_section(extraction: &Extraction) -> String {
    let title = extraction
        .quiz()
        .map(|q| q.title.as_str())
        .unwrap_or("Decoded data");
    // Only quizzes with questions are stored and downloadable.
    let links = match extraction.quiz() {
        Some(quiz) if !quiz.is_empty() => {
            let id = escape_html(&extraction.quiz_id);
            format!(
                " · <a href=\"/api/quizzes/{id}/download?format=txt\">Download .txt</a>\
                 · <a href=\"/api/quizzes/{id}/download?format=json\">JSON</a>"
            )
        }
        _ => String::new(),
    };
    let source = format!("{:?}", extraction.source).to_lowercase();
    render(
        templates::QUIZ,
        &[
            ("title", &escape_html(title)),
            ("source", &source),
            ("links", &links),
            ("formatted", &escape_html(&extraction.formatted)),
        ],
    )
}
