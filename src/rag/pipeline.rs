// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Index construction and retrieval-augmented answering

use crate::config::RagConfig;
use crate::documents::DocumentLoader;
use crate::embeddings::Embedder;
use crate::inference::{GenerationRequest, GenerativeModel};
use crate::rag::chunker::TextSplitter;
use crate::rag::errors::{RagError, RagResult};
use crate::rag::prompt::PromptTemplate;
use crate::vector::{IndexEntry, RetrievedSegment, VectorIndex};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Segments embedded per `embed_batch` call while indexing
const EMBED_BATCH_SIZE: usize = 32;

/// Load, split, embed and index every document
///
/// Runs to completion before anything is served. An empty document set
/// produces an empty index, which is not an error.
pub async fn build_index(
    loader: &dyn DocumentLoader,
    splitter: &TextSplitter,
    embedder: &dyn Embedder,
) -> RagResult<VectorIndex> {
    let started = Instant::now();

    let documents = loader.load().await?;
    info!("Loaded {} document(s)", documents.len());

    let segments = splitter.split_documents(&documents);
    info!(
        "Split into {} segment(s) (chunk_size={}, chunk_overlap={})",
        segments.len(),
        splitter.chunk_size(),
        splitter.chunk_overlap()
    );

    let mut entries = Vec::with_capacity(segments.len());
    for batch in segments.chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|s| s.text.clone()).collect();
        let embeddings = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;
        if embeddings.len() != batch.len() {
            return Err(RagError::Embedding(format!(
                "Embedder returned {} vectors for {} segments",
                embeddings.len(),
                batch.len()
            )));
        }
        entries.extend(
            batch
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(segment, embedding)| IndexEntry { segment, embedding }),
        );
    }

    let index = VectorIndex::build(entries, embedder.dimension())
        .map_err(|e| RagError::Index(format!("{:#}", e)))?;

    info!(
        "Indexed {} segment(s) with {} ({}D) in {:.2}s",
        index.len(),
        embedder.model_name(),
        index.dimensions(),
        started.elapsed().as_secs_f32()
    );

    Ok(index)
}

/// Retrieval and generation parameters of the answer chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    pub k: usize,
    pub max_new_tokens: usize,
    pub temperature: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: 2,
            max_new_tokens: 128,
            temperature: 0.01,
        }
    }
}

impl From<&RagConfig> for RetrievalSettings {
    fn from(config: &RagConfig) -> Self {
        Self {
            k: config.retrieval.k,
            max_new_tokens: config.generation.max_new_tokens,
            temperature: config.generation.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Segments the answer was generated from, best match first
    pub sources: Vec<RetrievedSegment>,
}

/// "Stuff" question answering: every retrieved segment goes into one prompt
#[derive(Clone)]
pub struct RetrievalQa {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    model: Arc<dyn GenerativeModel>,
    prompt: PromptTemplate,
    settings: RetrievalSettings,
}

impl RetrievalQa {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        model: Arc<dyn GenerativeModel>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            model,
            prompt: PromptTemplate::llama2_qa(),
            settings,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Answer one question from the indexed documents
    ///
    /// The question is used as given, including the empty string.
    pub async fn answer(&self, question: &str) -> RagResult<Answer> {
        let query = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let sources = self
            .index
            .search(&query, self.settings.k)
            .map_err(|e| RagError::Index(format!("{:#}", e)))?;
        for hit in &sources {
            debug!("Retrieved {} (score {:.3})", hit.source, hit.score);
        }

        let context = sources
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = self.prompt.render_qa(&context, question)?;
        debug!("Prompt: {:?}", prompt);

        let output = self
            .model
            .generate(&GenerationRequest {
                prompt,
                max_new_tokens: self.settings.max_new_tokens,
                temperature: self.settings.temperature,
            })
            .await
            .map_err(|e| RagError::Generation(format!("{:#}", e)))?;

        Ok(Answer {
            text: output.text.trim().to_string(),
            sources,
        })
    }
}
