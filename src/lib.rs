// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod inference;
pub mod rag;
pub mod vector;
pub mod version;

// Re-export main types
pub use config::RagConfig;
pub use documents::{Document, DocumentLoader, InMemoryLoader, PdfDirectoryLoader};
pub use embeddings::{Embedder, HashEmbedder, OnnxEmbeddingModel};
pub use inference::{GenerationOutput, GenerationRequest, GenerativeModel, LlmEngine};
pub use rag::{AppContext, Answer, RagError, RagResult, RetrievalQa, TextSplitter};
pub use vector::{RetrievedSegment, VectorIndex};
