// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Static page, health, version and fallback routes

use crate::common::{context_with, MockModel};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use fabstir_rag_node::{
    api::{build_router, ErrorResponse, HealthResponse},
    documents::Document,
    version,
};
use tower::util::ServiceExt;

async fn get(uri: &str) -> axum::response::Response {
    let ctx = context_with(
        vec![
            Document::new("Ontology is the study of being", "a.pdf"),
            Document::new("Epistemology is the study of knowledge", "b.pdf"),
        ],
        MockModel::replying("unused"),
    )
    .await;
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    build_router(ctx).oneshot(request).await.unwrap()
}

#[tokio::test]
async fn test_index_page_served() {
    let response = get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/chatbot"));
    assert!(html.contains("name=\"question\""));
}

#[tokio::test]
async fn test_health_reports_index_size() {
    let response = get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.documents_indexed, 2);
    assert_eq!(health.model, "mock-llama");
    assert_eq!(health.embedding_model, "hash-embedder");
    assert_eq!(health.version, version::VERSION);
}

#[tokio::test]
async fn test_version_route() {
    let response = get("/version").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["version"], version::VERSION_NUMBER);
}

#[tokio::test]
async fn test_unknown_route_is_404_json() {
    let response = get("/v1/inference").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.error_type, "not_found");
    assert!(body.message.contains("/v1/inference"));
}
