// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF directory loader
//!
//! Reads every file directly inside a directory whose name matches a glob
//! pattern (`*.pdf` by default) and extracts its text page by page with
//! `pdf-extract`. Each page with text becomes one `Document` carrying the
//! file path and the zero-based page number. Files are visited in path
//! order so the index is built deterministically.

use super::{Document, DocumentLoader};
use crate::rag::errors::{RagError, RagResult};
use async_trait::async_trait;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Loads PDF files from a single directory (not recursive)
#[derive(Debug, Clone)]
pub struct PdfDirectoryLoader {
    directory: PathBuf,
    pattern: Pattern,
}

impl PdfDirectoryLoader {
    /// Create a loader for `directory` filtered by `glob_pattern`
    ///
    /// # Errors
    /// Returns `RagError::InvalidPattern` if the pattern does not parse.
    pub fn new(directory: impl Into<PathBuf>, glob_pattern: &str) -> RagResult<Self> {
        let pattern = Pattern::new(glob_pattern).map_err(|e| RagError::InvalidPattern {
            pattern: glob_pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            directory: directory.into(),
            pattern,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Paths of matching files, sorted
    async fn matching_files(&self) -> RagResult<Vec<PathBuf>> {
        if !tokio::fs::metadata(&self.directory)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(RagError::DocumentsDirNotFound(
                self.directory.display().to_string(),
            ));
        }

        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                warn!("Skipping file with non UTF-8 name in {}", self.directory.display());
                continue;
            };
            if self.pattern.matches(name) {
                files.push(entry.path());
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DocumentLoader for PdfDirectoryLoader {
    async fn load(&self) -> RagResult<Vec<Document>> {
        let files = self.matching_files().await?;
        info!(
            "Loading {} document(s) matching '{}' from {}",
            files.len(),
            self.pattern.as_str(),
            self.directory.display()
        );

        let mut documents = Vec::new();
        for path in files {
            let source = path.display().to_string();
            let pages = extract_pdf_pages(&path).await?;
            let page_count = pages.len();

            let before = documents.len();
            for (page, text) in pages.into_iter().enumerate() {
                if text.trim().is_empty() {
                    debug!("{} page {} has no text", source, page);
                    continue;
                }
                documents.push(Document::new(text, source.clone()).with_page(page));
            }

            let kept = documents.len() - before;
            if kept == 0 {
                warn!(
                    "Skipping {}: no extractable text (image-based or encrypted PDF?)",
                    source
                );
            } else {
                debug!("Loaded {} ({} of {} page(s) with text)", source, kept, page_count);
            }
        }

        info!("Loaded {} page(s)", documents.len());
        Ok(documents)
    }
}

/// Extract the text layer of one PDF, one string per page, on the blocking pool
async fn extract_pdf_pages(path: &Path) -> RagResult<Vec<String>> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| RagError::DocumentLoad {
            path: display.clone(),
            reason: e.to_string(),
        })?;

    // pdf-extract can panic on malformed input; the join error covers that case
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .await
        .map_err(|e| RagError::DocumentLoad {
            path: display.clone(),
            reason: format!("extraction task failed: {}", e),
        })?
        .map_err(|e| RagError::DocumentLoad {
            path: display,
            reason: e.to_string(),
        })
}
