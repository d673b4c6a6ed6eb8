//! JSON API: decoding, extraction, stored quizzes and attempts.

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::WebContext;
use super::error::ApiError;
use crate::application::extractor::Extraction;
use crate::application::formatter::{format_questions, quiz_file_name};
use crate::domain::types::Quiz;
use crate::infrastructure::storage::{QuizAttempt, QuizRecord};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

pub(crate) fn create_router() -> Router {
    Router::new()
        .route("/api/decode", post(decode))
        .route("/api/extract", post(extract))
        .route("/quiz/{quiz_id}", get(extract_by_id))
        .route("/api/quizzes", get(list_quizzes))
        .route("/api/quizzes/{quiz_id}", get(get_quiz).delete(delete_quiz))
        .route("/api/quizzes/{quiz_id}/download", get(download_quiz))
        .route("/api/quizzes/{quiz_id}/attempts", post(create_attempt))
        .route("/api/attempts/{id}", patch(update_attempt))
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    url: String,
}

async fn decode(
    Extension(ctx): Extension<WebContext>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let (decoded, payload) = ctx.extractor.decode_url(&request.url)?;
    Ok(Json(json!({
        "success": true,
        "method": decoded.method,
        "encoding": decoded.encoding,
        "decoded": decoded.text,
        "data": payload,
    })))
}

#[derive(Debug, Serialize)]
struct ExtractResponse {
    success: bool,
    #[serde(flatten)]
    extraction: Extraction,
}

impl From<Extraction> for ExtractResponse {
    fn from(extraction: Extraction) -> Self {
        Self {
            success: true,
            extraction,
        }
    }
}

async fn extract(
    Extension(ctx): Extension<WebContext>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let extraction = ctx.extractor.extract_url(&request.url).await?;
    Ok(Json(extraction.into()))
}

async fn extract_by_id(
    Extension(ctx): Extension<WebContext>,
    Path(quiz_id): Path<String>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let extraction = ctx.extractor.extract_param(&quiz_id).await?;
    Ok(Json(extraction.into()))
}

/// Stored quiz metadata without the bulky payload columns.
#[derive(Debug, Serialize)]
struct QuizSummary {
    quiz_id: String,
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    question_count: i64,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    access_count: i64,
}

impl From<&QuizRecord> for QuizSummary {
    fn from(record: &QuizRecord) -> Self {
        Self {
            quiz_id: record.quiz_id.clone(),
            title: record.title.clone(),
            author: record.author.clone(),
            description: record.description.clone(),
            question_count: record.question_count,
            created_at: record.created_at,
            last_accessed: record.last_accessed,
            access_count: record.access_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    sort: Option<String>,
    q: Option<String>,
    limit: Option<i64>,
}

async fn list_quizzes(
    Extension(ctx): Extension<WebContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<QuizSummary>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let store = ctx.extractor.store();

    let records = match params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => store.search(query, limit).await?,
        None => match params.sort.as_deref().unwrap_or("recent") {
            "recent" => store.recent(limit).await?,
            "popular" => store.popular(limit).await?,
            other => {
                return Err(ApiError::BadRequest(format!(
                    "unknown sort '{other}', expected 'recent' or 'popular'"
                )));
            }
        },
    };
    Ok(Json(records.iter().map(QuizSummary::from).collect()))
}

async fn stored_quiz(ctx: &WebContext, quiz_id: &str) -> Result<(QuizRecord, Quiz), ApiError> {
    let record = ctx
        .extractor
        .store()
        .get_quiz(quiz_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("quiz '{quiz_id}' not found")))?;
    let quiz = record
        .quiz()?
        .ok_or_else(|| ApiError::NotFound(format!("quiz '{quiz_id}' has no stored data")))?;
    Ok((record, quiz))
}

async fn get_quiz(
    Extension(ctx): Extension<WebContext>,
    Path(quiz_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let (record, quiz) = stored_quiz(&ctx, &quiz_id).await?;
    Ok(Json(json!({
        "quiz": QuizSummary::from(&record),
        "data": quiz,
        "formatted": record.formatted_data,
    })))
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    format: Option<String>,
}

async fn download_quiz(
    Extension(ctx): Extension<WebContext>,
    Path(quiz_id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let (_, quiz) = stored_quiz(&ctx, &quiz_id).await?;
    let txt_name = quiz_file_name(&quiz_id, Utc::now().timestamp());

    let (content_type, file_name, body) = match params.format.as_deref().unwrap_or("txt") {
        "txt" => ("text/plain; charset=utf-8", txt_name, format_questions(&quiz)),
        "json" => (
            "application/json",
            txt_name.replace(".txt", ".json"),
            serde_json::to_string_pretty(&quiz)
                .map_err(|e| ApiError::Store(e.into()))?,
        ),
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown format '{other}', expected 'txt' or 'json'"
            )));
        }
    };

    let disposition = format!("attachment; filename=\"{file_name}\"");
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

fn authorize(ctx: &WebContext, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(secret) = ctx.secret_key.as_deref() else {
        return Ok(());
    };
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(token) if token == secret => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

async fn delete_quiz(
    Extension(ctx): Extension<WebContext>,
    headers: HeaderMap,
    Path(quiz_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authorize(&ctx, &headers)?;
    if ctx.extractor.store().delete_quiz(&quiz_id).await? {
        tracing::info!("Deleted quiz {}", quiz_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("quiz '{quiz_id}' not found")))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewAttempt {
    user_id: Option<String>,
}

async fn create_attempt(
    Extension(ctx): Extension<WebContext>,
    Path(quiz_id): Path<String>,
    Json(request): Json<NewAttempt>,
) -> Result<(StatusCode, Json<QuizAttempt>), ApiError> {
    let attempt = ctx
        .extractor
        .store()
        .create_attempt(&quiz_id, request.user_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AttemptUpdate {
    score: Option<i64>,
    completed: Option<bool>,
}

async fn update_attempt(
    Extension(ctx): Extension<WebContext>,
    Path(id): Path<i64>,
    Json(update): Json<AttemptUpdate>,
) -> Result<Json<QuizAttempt>, ApiError> {
    let store = ctx.extractor.store();
    let current = store
        .get_attempt(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("attempt {id} not found")))?;

    if let Some(score) = update.score
        && !(0..=current.max_score).contains(&score)
    {
        return Err(ApiError::Unprocessable(format!(
            "score must be between 0 and {}",
            current.max_score
        )));
    }

    store
        .update_attempt(id, update.score, update.completed)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("attempt {id} not found")))
}
