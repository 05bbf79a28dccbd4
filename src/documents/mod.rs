// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Document loading: raw text plus where it came from

pub mod pdf_loader;

use crate::rag::errors::RagResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use pdf_loader::PdfDirectoryLoader;

/// Raw text of one source page (or of a whole text). Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    /// Originating file (or any caller-chosen identifier)
    pub source: String,
    /// Zero-based page within `source`, for paginated sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

impl Document {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

/// Produces the ordered document set the index is built from
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self) -> RagResult<Vec<Document>>;
}

/// Loader over a fixed list of documents
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    documents: Vec<Document>,
}

impl InMemoryLoader {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentLoader for InMemoryLoader {
    async fn load(&self) -> RagResult<Vec<Document>> {
        Ok(self.documents.clone())
    }
}
