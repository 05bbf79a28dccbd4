// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::errors::ApiError;
use crate::rag::AppContext;
use crate::version;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{Html, Json};
use axum::Form;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const INDEX_PAGE: &str = include_str!("templates/index.html");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotForm {
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatbotResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub documents_indexed: usize,
    pub model: String,
    pub embedding_model: String,
    pub version: String,
}

/// POST /chatbot
pub async fn chatbot_handler(
    State(ctx): State<Arc<AppContext>>,
    Form(form): Form<ChatbotForm>,
) -> Result<Json<ChatbotResponse>, ApiError> {
    info!("Question: {:?}", form.question);

    let answer = ctx.qa().answer(&form.question).await?;
    info!(
        "Answer from {} segment(s): {:?}",
        answer.sources.len(),
        answer.text
    );

    Ok(Json(ChatbotResponse {
        response: answer.text,
    }))
}

/// GET /health
pub async fn health_handler(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        documents_indexed: ctx.index().len(),
        model: ctx.model().model_name().to_string(),
        embedding_model: ctx.embedder().model_name().to_string(),
        version: version::VERSION.to_string(),
    })
}

/// GET /version
pub async fn version_handler() -> Json<serde_json::Value> {
    Json(version::get_version_info())
}

/// GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
