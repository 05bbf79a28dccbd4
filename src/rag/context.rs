// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Application context
//!
//! Everything a request handler needs, constructed once at startup and
//! shared behind an `Arc`.

use crate::config::{EmbeddingSettings, GenerationConfig, RagConfig};
use crate::documents::{DocumentLoader, PdfDirectoryLoader};
use crate::embeddings::{resolve_model_files, Embedder, OnnxEmbeddingModel};
use crate::inference::{EngineConfig, GenerativeModel, LlmEngine};
use crate::rag::chunker::TextSplitter;
use crate::rag::errors::{RagError, RagResult};
use crate::rag::pipeline::{build_index, RetrievalQa, RetrievalSettings};
use crate::vector::VectorIndex;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    model: Arc<dyn GenerativeModel>,
    qa: RetrievalQa,
}

impl AppContext {
    /// Assemble a context from parts that are already built
    ///
    /// # Errors
    /// The index and the embedder disagree on dimensions.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        model: Arc<dyn GenerativeModel>,
    ) -> RagResult<Self> {
        if index.dimensions() != embedder.dimension() {
            return Err(RagError::Config(format!(
                "Index has {} dimensions but embedder {} produces {}",
                index.dimensions(),
                embedder.model_name(),
                embedder.dimension()
            )));
        }

        let qa = RetrievalQa::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            Arc::clone(&model),
            RetrievalSettings::from(&config),
        );

        Ok(Self {
            config,
            embedder,
            index,
            model,
            qa,
        })
    }

    /// Build the index from `loader`, then assemble the context
    pub async fn from_loader(
        config: RagConfig,
        loader: &dyn DocumentLoader,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn GenerativeModel>,
    ) -> RagResult<Self> {
        let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let index = build_index(loader, &splitter, embedder.as_ref()).await?;
        Self::new(config, embedder, Arc::new(index), model)
    }

    /// Production startup: ONNX embedder, PDF directory, GGUF model
    pub async fn initialize(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let embedder = load_embedder(&config.embedding).await?;
        let loader = PdfDirectoryLoader::new(&config.documents.directory, &config.documents.glob)?;
        let model = load_model(&config.generation).await?;

        let context = Self::from_loader(config, &loader, embedder, model).await?;
        info!(
            "Ready: {} segment(s) indexed, model {}",
            context.index.len(),
            context.model.model_name()
        );
        Ok(context)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn model(&self) -> &Arc<dyn GenerativeModel> {
        &self.model
    }

    pub fn qa(&self) -> &RetrievalQa {
        &self.qa
    }
}

/// Resolve model files and load the ONNX sentence transformer
pub async fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let files = resolve_model_files(&settings.model_id, &settings.model_dir).await?;
    let model_name = settings
        .model_id
        .rsplit('/')
        .next()
        .unwrap_or(settings.model_id.as_str());
    let model = OnnxEmbeddingModel::new(model_name, &files.model_path, &files.tokenizer_path).await?;

    if model.dimension() != settings.dimensions {
        return Err(RagError::Config(format!(
            "Embedding model {} produces {} dimensions, configured {}",
            model_name,
            model.dimension(),
            settings.dimensions
        ))
        .into());
    }
    Ok(Arc::new(model))
}

pub async fn load_model(config: &GenerationConfig) -> Result<Arc<dyn GenerativeModel>> {
    let engine = LlmEngine::load(EngineConfig::from(config)).await?;
    Ok(Arc::new(engine))
}
