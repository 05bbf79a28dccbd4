// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding model file resolution
//!
//! Prefers `model.onnx` + `tokenizer.json` in the configured local directory
//! and falls back to the Hugging Face hub cache otherwise.

use anyhow::{Context, Result};
use hf_hub::api::tokio::Api;
use std::path::{Path, PathBuf};
use tracing::info;

/// ONNX export inside sentence-transformers repositories
const HUB_MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const LOCAL_MODEL_FILE: &str = "model.onnx";

/// Paths to the files `OnnxEmbeddingModel::new` needs
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

/// Local files when both exist in `local_dir`, if any
pub fn local_model_files(local_dir: &Path) -> Option<ModelFiles> {
    let model_path = local_dir.join(LOCAL_MODEL_FILE);
    let tokenizer_path = local_dir.join(TOKENIZER_FILE);
    (model_path.is_file() && tokenizer_path.is_file()).then_some(ModelFiles {
        model_path,
        tokenizer_path,
    })
}

/// Resolve model files for `model_id`, downloading them when not present locally
pub async fn resolve_model_files(model_id: &str, local_dir: &Path) -> Result<ModelFiles> {
    if let Some(files) = local_model_files(local_dir) {
        info!("Using local embedding model files in {}", local_dir.display());
        return Ok(files);
    }

    info!(
        "Embedding model not found in {}, fetching {} from Hugging Face hub",
        local_dir.display(),
        model_id
    );
    let api = Api::new().context("Failed to initialise Hugging Face hub client")?;
    let repo = api.model(model_id.to_string());

    let model_path = repo
        .get(HUB_MODEL_FILE)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", HUB_MODEL_FILE, model_id))?;
    let tokenizer_path = repo
        .get(TOKENIZER_FILE)
        .await
        .with_context(|| format!("Failed to fetch {} from {}", TOKENIZER_FILE, model_id))?;

    Ok(ModelFiles {
        model_path,
        tokenizer_path,
    })
}
