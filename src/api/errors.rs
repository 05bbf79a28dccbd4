// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::rag::errors::RagError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InternalError {
        message: String,
        /// Machine-readable cause, e.g. `GENERATION_FAILED`
        code: Option<&'static str>,
    },
}

impl ApiError {
    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(path) => ("not_found", format!("No route for {}", path), None),
            ApiError::InternalError { message, code } => {
                let details = code.map(|code| {
                    let mut details = HashMap::new();
                    details.insert(
                        "code".to_string(),
                        serde_json::Value::String(code.to_string()),
                    );
                    details
                });
                ("internal_error", message.clone(), details)
            }
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InternalError { .. } => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(path) => write!(f, "Not found: {}", path),
            ApiError::InternalError { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Every pipeline failure surfaces as a 500; the full cause goes to the log only
impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        error!(code = err.error_code(), "Request failed: {}", err);
        ApiError::InternalError {
            message: err.user_message(),
            code: Some(err.error_code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.to_response(Some(Uuid::new_v4().to_string()));
        (status, Json(body)).into_response()
    }
}
