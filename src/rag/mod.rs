// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// RAG (Retrieval-Augmented Generation) module
// Chunking, prompt assembly and the question-answering chain over the document index

pub mod chunker;
pub mod context;
pub mod errors;
pub mod pipeline;
pub mod prompt;

pub use chunker::{Segment, TextSplitter};
pub use context::{load_embedder, load_model, AppContext};
pub use errors::{RagError, RagResult};
pub use pipeline::{build_index, Answer, RetrievalQa, RetrievalSettings};
pub use prompt::PromptTemplate;
