// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use fabstir_rag_node::{api, config::RagConfig, rag::AppContext, version};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// PDF question-answering node
#[derive(Parser, Debug)]
#[command(name = "fabstir-rag-node", version = version::VERSION_NUMBER)]
struct Args {
    /// TOML configuration file; environment variables override its values
    #[arg(long, env = "RAG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // RUST_LOG (e.g. `fabstir_rag_node=debug`) overrides the info default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting {}", version::get_version_string());

    let config = RagConfig::load(args.config.as_deref())?;
    info!(
        "Documents: {} ({}), chunking {}/{}, k={}",
        config.documents.directory.display(),
        config.documents.glob,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
        config.retrieval.k
    );

    // Index is fully built before the listener binds
    let listen_addr = config.server.listen_addr.clone();
    let context = Arc::new(AppContext::initialize(config).await?);

    api::serve(&listen_addr, context).await?;

    info!("Shutdown complete");
    Ok(())
}
