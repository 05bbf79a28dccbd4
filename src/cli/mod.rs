// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fabstir RAG Node CLI
#[derive(Parser, Debug)]
#[command(name = "fabstir-rag-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Ask questions about local PDF documents from the terminal", long_about = None)]
pub struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(long, env = "RAG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the documents and answer one question
    Ask(commands::AskArgs),

    /// Translate English text to French with the local model (no retrieval)
    Translate(commands::TranslateArgs),

    /// Index the documents and report what was found
    Index(commands::IndexArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Ask(args) => commands::ask(config, args).await,
        Commands::Translate(args) => commands::translate(config, args).await,
        Commands::Index(args) => commands::index(config, args).await,
    }
}
