// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HNSW Index over document segments
//!
//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbour
//! search from `hnsw_rs`, using cosine distance. The index is built once at
//! startup and is read-only afterwards.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fabstir_rag_node::vector::{IndexEntry, VectorIndex};
//!
//! let index = VectorIndex::build(entries, 384)?;
//! let hits = index.search(&query_embedding, 2)?;
//! for hit in hits {
//!     println!("{} ({:.3}): {}", hit.source, hit.score, hit.text);
//! }
//! ```

use crate::rag::chunker::Segment;
use anyhow::{anyhow, Result};
use hnsw_rs::hnsw::{Hnsw, Neighbour};
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

/// A segment paired with its embedding, as handed to the index
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub segment: Segment,
    pub embedding: Vec<f32>,
}

/// Search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSegment {
    pub text: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Cosine similarity (1.0 = identical direction)
    pub score: f32,
}

/// Approximate nearest neighbour index for segment embeddings
pub struct VectorIndex {
    hnsw: Hnsw<'static, f32, DistCosine>,

    /// Segments by HNSW data id
    segments: Vec<Segment>,

    dimensions: usize,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("entries", &self.segments.len())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Build the index from embedded segments
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - An embedding has the wrong dimensions
    /// - An embedding contains NaN or Infinity values
    pub fn build(entries: Vec<IndexEntry>, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(anyhow!("Index dimensions must be greater than 0"));
        }

        for (i, entry) in entries.iter().enumerate() {
            if entry.embedding.len() != dimensions {
                return Err(anyhow!(
                    "Entry {} ({} #{}) has wrong dimensions: expected {}, got {}",
                    i,
                    entry.segment.source,
                    entry.segment.index,
                    dimensions,
                    entry.embedding.len()
                ));
            }
            if entry.embedding.iter().any(|&v| !v.is_finite()) {
                return Err(anyhow!(
                    "Entry {} ({} #{}) contains NaN or Infinity values",
                    i,
                    entry.segment.source,
                    entry.segment.index
                ));
            }
        }

        // M=12 / ef_construction=48 keep construction fast for 384D embeddings
        let max_nb_connection = 12;
        let ef_construction = 48;
        let nb_layer = if entries.len() > 1 {
            ((entries.len() as f32).log2().ceil() as usize).clamp(4, 16)
        } else {
            4
        };

        let mut hnsw: Hnsw<'static, f32, DistCosine> = Hnsw::new(
            max_nb_connection,
            entries.len().max(1),
            nb_layer,
            ef_construction,
            DistCosine,
        );

        let mut segments = Vec::with_capacity(entries.len());
        for (data_id, entry) in entries.into_iter().enumerate() {
            let normalized = normalize_vector(&entry.embedding);
            hnsw.insert((normalized.as_slice(), data_id));
            segments.push(entry.segment);
        }

        hnsw.set_searching_mode(true);

        Ok(Self {
            hnsw,
            segments,
            dimensions,
        })
    }

    /// Top-k segments by cosine similarity, highest first
    ///
    /// An empty index or `k == 0` yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns error if the query has the wrong dimensions or non-finite values.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedSegment>> {
        if query.len() != self.dimensions {
            return Err(anyhow!(
                "Query has wrong dimensions: expected {}, got {}",
                self.dimensions,
                query.len()
            ));
        }
        if query.iter().any(|&v| !v.is_finite()) {
            return Err(anyhow!("Query contains NaN or Infinity values"));
        }
        if self.segments.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let normalized_query = normalize_vector(query);
        let k = k.min(self.segments.len());
        // ef_search should be >= k (typically 1.5-2x k)
        let ef_search = (k * 2).max(50);
        let neighbours: Vec<Neighbour> = self.hnsw.search(&normalized_query, k, ef_search);

        let mut results: Vec<RetrievedSegment> = neighbours
            .into_iter()
            .filter_map(|neighbour| {
                self.segments.get(neighbour.d_id).map(|segment| RetrievedSegment {
                    text: segment.text.clone(),
                    source: segment.source.clone(),
                    page: segment.page,
                    // cosine distance -> similarity
                    score: 1.0 - neighbour.distance,
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);

        Ok(results)
    }

    /// Number of indexed segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Divide by the L2 norm; zero and non-finite-norm vectors are returned as is
fn normalize_vector(vector: &[f32]) -> Vec<f32> {
    let magnitude: f32 = vector.iter().map(|&x| x * x).sum::<f32>().sqrt();

    if magnitude == 0.0 || !magnitude.is_finite() {
        return vector.to_vec();
    }

    vector.iter().map(|&x| x / magnitude).collect()
}
