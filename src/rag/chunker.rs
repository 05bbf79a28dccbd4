// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fixed-width sliding window chunker
//!
//! Splits document text into segments of at most `chunk_size` characters,
//! each sharing `chunk_overlap` characters with the previous segment.
//! Lengths are counted in Unicode scalar values, so a window never ends
//! inside a multi-byte character.

use crate::documents::Document;
use crate::rag::errors::{RagError, RagResult};
use serde::{Deserialize, Serialize};

/// A bounded slice of one document's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Source identifier of the parent document
    pub source: String,
    /// Page of the parent document, if it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Position of this segment within its document
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// # Errors
    /// `chunk_size` must be non-zero and strictly larger than `chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> RagResult<Self> {
        if chunk_size == 0 {
            return Err(RagError::Chunking("chunk_size must be greater than 0".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Chunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Number of segments `split_text` produces for a text of `len` characters
    pub fn segment_count(&self, len: usize) -> usize {
        if len <= self.chunk_size {
            return 1;
        }
        let stride = self.chunk_size - self.chunk_overlap;
        (len - self.chunk_overlap).div_ceil(stride)
    }

    /// Split raw text. A text no longer than `chunk_size` (including the
    /// empty text) comes back as a single segment equal to the input.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        // Byte offset of every char boundary, plus the end of the text
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        if char_len <= self.chunk_size {
            return vec![text.to_string()];
        }

        let stride = self.chunk_size - self.chunk_overlap;
        let mut segments = Vec::with_capacity(self.segment_count(char_len));
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(char_len);
            segments.push(text[boundaries[start]..boundaries[end]].to_string());
            if end == char_len {
                break;
            }
            start += stride;
        }

        segments
    }

    /// Split every document, keeping document order and source identifiers.
    /// Segments never span two documents, so paginated sources never get a
    /// segment that crosses a page break.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Segment> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text)
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| Segment {
                        text,
                        source: doc.source.clone(),
                        page: doc.page,
                        index,
                    })
            })
            .collect()
    }
}
