// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the RAG node
//!
//! Defaults reproduce the reference deployment (500/50 chunking, k=2,
//! 128 new tokens at temperature 0.01). Values can be overridden from a TOML
//! file and then from environment variables.

use crate::rag::errors::{RagError, RagResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Where documents are read from at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Directory scanned for documents (not recursive)
    pub directory: PathBuf,
    /// File filter applied to names inside `directory`
    pub glob: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data/"),
            glob: "*.pdf".to_string(),
        }
    }
}

/// Segment size and overlap, in characters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Sentence-transformer used for both segments and questions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Hugging Face model id, used when files are missing locally
    pub model_id: String,
    /// Directory holding `model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2-onnx"),
            dimensions: 384,
        }
    }
}

/// Local generative model and its decoding parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// GGUF model file
    pub model_path: PathBuf,
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub context_size: usize,
    pub gpu_layers: u32,
    pub batch_size: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model/llama-2-7b-chat.Q4_0.gguf"),
            max_new_tokens: 128,
            temperature: 0.01,
            context_size: 2048,
            gpu_layers: 0,
            batch_size: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of segments placed in the prompt context
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    pub documents: DocumentsConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file. Missing sections keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> RagResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| RagError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the optional file, then apply environment overrides, then validate
    pub fn load(path: Option<&Path>) -> RagResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables that are set
    ///
    /// # Errors
    /// A numeric variable that is set but does not parse.
    pub fn apply_env(&mut self) -> RagResult<()> {
        if let Ok(dir) = env::var("DOCUMENTS_DIR") {
            self.documents.directory = PathBuf::from(dir);
        }
        if let Ok(glob) = env::var("DOCUMENTS_GLOB") {
            self.documents.glob = glob;
        }
        if let Some(size) = parse_env("CHUNK_SIZE")? {
            self.chunking.chunk_size = size;
        }
        if let Some(overlap) = parse_env("CHUNK_OVERLAP")? {
            self.chunking.chunk_overlap = overlap;
        }
        if let Ok(model_id) = env::var("EMBEDDING_MODEL_ID") {
            self.embedding.model_id = model_id;
        }
        if let Ok(dir) = env::var("EMBEDDING_MODEL_DIR") {
            self.embedding.model_dir = PathBuf::from(dir);
        }
        if let Ok(path) = env::var("MODEL_PATH") {
            self.generation.model_path = PathBuf::from(path);
        }
        if let Some(max_new_tokens) = parse_env("MAX_NEW_TOKENS")? {
            self.generation.max_new_tokens = max_new_tokens;
        }
        if let Some(temperature) = parse_env("TEMPERATURE")? {
            self.generation.temperature = temperature;
        }
        if let Some(context_size) = parse_env("MAX_CONTEXT_LENGTH")? {
            self.generation.context_size = context_size;
        }
        if let Some(gpu_layers) = parse_env("GPU_LAYERS")? {
            self.generation.gpu_layers = gpu_layers;
        }
        if let Some(batch_size) = parse_env("LLAMA_BATCH_SIZE")? {
            self.generation.batch_size = batch_size;
        }
        if let Some(k) = parse_env("RETRIEVAL_K")? {
            self.retrieval.k = k;
        }
        if let Ok(addr) = env::var("LISTEN_ADDR") {
            self.server.listen_addr = addr;
        } else if let Ok(port) = env::var("API_PORT") {
            self.server.listen_addr = format!("0.0.0.0:{}", port);
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> RagResult<()> {
        if self.documents.glob.trim().is_empty() {
            return Err(RagError::Config("Document glob must not be empty".to_string()));
        }
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Config("Chunk size must be greater than 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(RagError::Config(
                "Embedding dimensions must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.k == 0 {
            return Err(RagError::Config("Retrieval k must be greater than 0".to_string()));
        }
        if self.generation.max_new_tokens == 0 {
            return Err(RagError::Config(
                "max_new_tokens must be greater than 0".to_string(),
            ));
        }
        if !self.generation.temperature.is_finite() || self.generation.temperature < 0.0 {
            return Err(RagError::Config(format!(
                "Temperature must be a finite non-negative number, got {}",
                self.generation.temperature
            )));
        }
        if self.generation.batch_size == 0 {
            return Err(RagError::Config("Batch size must be greater than 0".to_string()));
        }
        if self.generation.context_size <= self.generation.max_new_tokens {
            return Err(RagError::Config(format!(
                "Context size ({}) must exceed max_new_tokens ({})",
                self.generation.context_size, self.generation.max_new_tokens
            )));
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str) -> RagResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => value.trim().parse().map(Some).map_err(|e| {
            RagError::Config(format!("{}={:?} is not valid: {}", key, value, e))
        }),
        Err(_) => Ok(None),
    }
}
