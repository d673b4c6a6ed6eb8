//! # HTTP Interface
//!
//! The web front end: HTML pages for pasting links and a JSON API over the
//! extractor and the quiz database. Runs next to the bot polling loop.

use anyhow::{Context, Result};
use axum::{Extension, Router};
use std::sync::Arc;

use crate::application::extractor::QuizExtractor;

mod api;
mod error;
mod pages;

pub use error::ApiError;

/// Shared request context, injected as an `Extension`.
#[derive(Clone)]
pub struct WebContext {
    pub extractor: Arc<QuizExtractor>,
    /// Guards destructive routes when set.
    pub secret_key: Option<String>,
}

pub fn create_app(ctx: WebContext) -> Router {
    Router::new()
        .merge(pages::create_router())
        .merge(api::create_router())
        .layer(Extension(ctx))
}

pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind web server to {addr}"))?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await.context("Web server failed")
}
