use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::application::decoder::DecodeError;
use crate::application::extractor::ExtractError;
use crate::infrastructure::storage::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Extract(e) => match e {
                ExtractError::Link(_) | ExtractError::Decode(DecodeError::EmptyParameter) => {
                    StatusCode::BAD_REQUEST
                }
                ExtractError::Decode(DecodeError::Exhausted(_)) | ExtractError::ShortCode(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ExtractError::Store(e) => store_status(e),
            },
            ApiError::Store(e) => store_status(e),
        }
    }
}

fn store_status(error: &StoreError) -> StatusCode {
    match error {
        StoreError::QuizNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = &self as &dyn std::error::Error, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}
