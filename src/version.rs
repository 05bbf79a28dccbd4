// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Fabstir RAG Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-pdf-rag-2025-10-16";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-16";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "pdf-loading",
    "sliding-window-chunking",
    "onnx-embeddings",
    "hnsw-retrieval",
    "llama-cpp-generation",
    "form-chatbot-endpoint",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir RAG Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
