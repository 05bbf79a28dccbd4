// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::config::RagConfig;
use crate::documents::PdfDirectoryLoader;
use crate::embeddings::{Embedder, HashEmbedder};
use crate::inference::GenerationRequest;
use crate::rag::prompt::TEXT_SLOT;
use crate::rag::{build_index, load_embedder, load_model, AppContext, PromptTemplate, TextSplitter};
use anyhow::Result;
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Arguments for ask command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// Question to answer from the documents
    #[arg(long, short)]
    pub question: String,

    /// Also print the retrieved segments
    #[arg(long)]
    pub show_sources: bool,
}

/// Arguments for translate command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// English text to translate
    #[arg(long, short)]
    pub text: String,
}

/// Arguments for index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Use the model-free hash embedder instead of the ONNX model
    #[arg(long)]
    pub hash_embeddings: bool,
}

/// Defaults, then the optional file, then environment; validated
pub fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    dotenv::dotenv().ok();
    Ok(RagConfig::load(path)?)
}

pub async fn ask(config: RagConfig, args: AskArgs) -> Result<()> {
    let context = AppContext::initialize(config).await?;
    let answer = context.qa().answer(&args.question).await?;

    println!("answer: {}", answer.text);
    if args.show_sources {
        for (i, source) in answer.sources.iter().enumerate() {
            let location = match source.page {
                Some(page) => format!("{} p.{}", source.source, page + 1),
                None => source.source.clone(),
            };
            println!("\n[{}] {} (score {:.3})\n{}", i + 1, location, source.score, source.text);
        }
    }
    Ok(())
}

pub async fn translate(config: RagConfig, args: TranslateArgs) -> Result<()> {
    let prompt = PromptTemplate::llama2_translation().render(&[(TEXT_SLOT, args.text.as_str())])?;
    let model = load_model(&config.generation).await?;

    let output = model
        .generate(&GenerationRequest {
            prompt,
            max_new_tokens: config.generation.max_new_tokens,
            temperature: config.generation.temperature,
        })
        .await?;

    println!("{}", output.text.trim());
    Ok(())
}

pub async fn index(config: RagConfig, args: IndexArgs) -> Result<()> {
    let embedder: Arc<dyn Embedder> = if args.hash_embeddings {
        Arc::new(HashEmbedder::new(config.embedding.dimensions)?)
    } else {
        load_embedder(&config.embedding).await?
    };
    let loader = PdfDirectoryLoader::new(&config.documents.directory, &config.documents.glob)?;
    let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

    let index = build_index(&loader, &splitter, embedder.as_ref()).await?;
    info!("Index built with {}", embedder.model_name());

    println!(
        "{}: {} segment(s), {} dimensions",
        loader.directory().display(),
        index.len(),
        index.dimensions()
    );
    Ok(())
}
