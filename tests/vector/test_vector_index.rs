// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HNSW index over embedded segments

use fabstir_rag_node::{
    embeddings::{Embedder, HashEmbedder},
    rag::Segment,
    vector::{IndexEntry, VectorIndex},
};
use std::time::Instant;

async fn entries(count: usize, embedder: &HashEmbedder) -> Vec<IndexEntry> {
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let text = format!("segment {}", i);
        entries.push(IndexEntry {
            embedding: embedder.embed(&text).await.unwrap(),
            segment: Segment {
                text,
                source: format!("doc{}.pdf", i / 10),
                page: Some(i % 3),
                index: i % 10,
            },
        });
    }
    entries
}

#[tokio::test]
async fn test_every_segment_finds_itself() {
    let embedder = HashEmbedder::new(384).unwrap();
    let index = VectorIndex::build(entries(200, &embedder).await, 384).unwrap();
    assert_eq!(index.len(), 200);

    for i in (0..200).step_by(17) {
        let query = embedder.embed(&format!("segment {}", i)).await.unwrap();
        let hits = index.search(&query, 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, format!("segment {}", i));
        assert_eq!(hits[0].source, format!("doc{}.pdf", i / 10));
        assert_eq!(hits[0].page, Some(i % 3));
    }
}

#[tokio::test]
async fn test_k_larger_than_index() {
    let embedder = HashEmbedder::new(64).unwrap();
    let index = VectorIndex::build(entries(3, &embedder).await, 64).unwrap();

    let query = embedder.embed("anything").await.unwrap();
    let hits = index.search(&query, 10).unwrap();
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_unnormalized_vectors_use_cosine() {
    let segment = |text: &str| Segment {
        text: text.to_string(),
        source: "a.pdf".to_string(),
        page: None,
        index: 0,
    };
    let index = VectorIndex::build(
        vec![
            IndexEntry {
                segment: segment("long"),
                embedding: vec![100.0, 0.0, 0.0],
            },
            IndexEntry {
                segment: segment("diagonal"),
                embedding: vec![0.1, 0.1, 0.0],
            },
        ],
        3,
    )
    .unwrap();

    let hits = index.search(&[0.001, 0.0, 0.0], 1).unwrap();
    assert_eq!(hits[0].text, "long");
}

#[tokio::test]
async fn test_search_latency_1k_segments() {
    let embedder = HashEmbedder::new(384).unwrap();
    let index = VectorIndex::build(entries(1000, &embedder).await, 384).unwrap();
    let query = embedder.embed("segment 500").await.unwrap();

    let start = Instant::now();
    for _ in 0..100 {
        index.search(&query, 2).unwrap();
    }
    let avg = start.elapsed() / 100;
    println!("Average search time over 1k segments: {:?}", avg);
    assert!(avg.as_millis() < 50);
}
