// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the document-to-answer pipeline
//!
//! Covers every stage of the pipeline:
//! - Document loading (missing directory, unreadable or corrupt PDFs)
//! - Chunking policy and configuration validation
//! - Embedding, index construction and search
//! - Answer generation

use thiserror::Error;

/// Errors that can occur while building the index or answering a question
#[derive(Error, Debug)]
pub enum RagError {
    /// Documents directory does not exist or is not a directory
    #[error("Documents directory not found: {0}")]
    DocumentsDirNotFound(String),

    /// A document matched the file filter but could not be read or parsed
    #[error("Failed to load document {path}: {reason}")]
    DocumentLoad { path: String, reason: String },

    /// Document file filter is not a valid glob pattern
    #[error("Invalid document pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Chunking parameters are unusable
    #[error("Invalid chunking policy: {0}")]
    Chunking(String),

    /// Embedding model failed on a segment or a query
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Vector index could not be built or searched
    #[error("Vector index error: {0}")]
    Index(String),

    /// Generative model failed to produce an answer
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected failures
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Get user-friendly error message for API responses
    pub fn user_message(&self) -> String {
        match self {
            RagError::DocumentsDirNotFound(path) => {
                format!("Document directory not found: {}", path)
            }
            RagError::DocumentLoad { path, .. } => {
                format!("Could not read document: {}", path)
            }
            RagError::Embedding(_) => "Failed to embed the question".to_string(),
            RagError::Index(_) => "Failed to search the document index".to_string(),
            RagError::Generation(_) => "The language model failed to produce an answer".to_string(),
            _ => self.to_string(),
        }
    }

    /// Get error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::DocumentsDirNotFound(_) => "DOCUMENTS_DIR_NOT_FOUND",
            RagError::DocumentLoad { .. } => "DOCUMENT_LOAD_FAILED",
            RagError::InvalidPattern { .. } => "INVALID_PATTERN",
            RagError::Chunking(_) => "INVALID_CHUNKING",
            RagError::Embedding(_) => "EMBEDDING_FAILED",
            RagError::Index(_) => "INDEX_ERROR",
            RagError::Generation(_) => "GENERATION_FAILED",
            RagError::Config(_) => "INVALID_CONFIG",
            RagError::Io(_) => "IO_ERROR",
            RagError::Other(_) => "OTHER",
        }
    }
}

pub type RagResult<T> = std::result::Result<T, RagError>;
