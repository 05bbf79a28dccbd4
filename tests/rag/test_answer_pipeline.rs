// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Retrieval-augmented answering over in-memory documents

use crate::common::{context_with, MockModel};
use fabstir_rag_node::{
    documents::Document,
    embeddings::{Embedder, HashEmbedder},
    rag::{PromptTemplate, RagError},
};

#[tokio::test]
async fn test_single_document_is_retrieved() {
    let model = MockModel::replying("Ontology is the study of being.");
    let ctx = context_with(
        vec![Document::new("Ontology is the study of being", "data/ontology.pdf")],
        model.clone(),
    )
    .await;

    let answer = ctx.qa().answer("What is ontology?").await.unwrap();

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].text, "Ontology is the study of being");
    assert_eq!(answer.sources[0].source, "data/ontology.pdf");
    assert!(!answer.text.is_empty());
}

#[tokio::test]
async fn test_at_most_k_segments_retrieved() {
    let docs = (0..10)
        .map(|i| Document::new(format!("fact number {}", i), format!("doc{}.pdf", i)))
        .collect();
    let model = MockModel::replying("ok");
    let ctx = context_with(docs, model.clone()).await;

    let answer = ctx.qa().answer("fact number 3").await.unwrap();
    assert_eq!(answer.sources.len(), 2);
    assert!(answer.sources[0].score >= answer.sources[1].score);
}

#[tokio::test]
async fn test_exact_text_query_ranks_its_segment_first() {
    // Hash embeddings only carry meaning for identical text
    let docs = vec![
        Document::new("alpha", "a.pdf"),
        Document::new("beta", "b.pdf"),
        Document::new("gamma", "c.pdf"),
    ];
    let ctx = context_with(docs, MockModel::replying("ok")).await;

    let answer = ctx.qa().answer("beta").await.unwrap();
    assert_eq!(answer.sources[0].text, "beta");
    assert!((answer.sources[0].score - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn test_prompt_follows_llama2_format() {
    let model = MockModel::replying("ok");
    let ctx = context_with(vec![Document::new("being", "a.pdf")], model.clone()).await;

    ctx.qa().answer("What is ontology?").await.unwrap();

    let prompt = &model.requests()[0].prompt;
    assert!(prompt.starts_with("[INST]<<SYS>>"));
    assert!(prompt.trim_end().ends_with("[/INST]"));
    assert!(prompt.contains("just say that you don't know"));
}

#[tokio::test]
async fn test_slot_markers_in_question_stay_literal() {
    let model = MockModel::replying("ok");
    let ctx = context_with(vec![Document::new("being", "a.pdf")], model.clone()).await;

    ctx.qa().answer("what is {context}?").await.unwrap();

    let prompt = &model.requests()[0].prompt;
    assert!(prompt.contains("Question: what is {context}?"));
}

#[tokio::test]
async fn test_custom_prompt_template() {
    let model = MockModel::replying("ok");
    let ctx = context_with(vec![Document::new("being", "a.pdf")], model.clone()).await;

    let qa = ctx
        .qa()
        .clone()
        .with_prompt(PromptTemplate::question_answering("<{context}> {question}").unwrap());
    qa.answer("why?").await.unwrap();

    assert_eq!(model.requests()[0].prompt, "<being> why?");
}

#[tokio::test]
async fn test_model_failure_is_generation_error() {
    let model = MockModel::failing();
    let ctx = context_with(vec![Document::new("being", "a.pdf")], model.clone()).await;

    let err = ctx.qa().answer("What is ontology?").await.unwrap_err();
    assert!(matches!(err, RagError::Generation(_)));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_embedding_is_deterministic_across_instances() {
    let a = HashEmbedder::new(384).unwrap();
    let b = HashEmbedder::new(384).unwrap();
    assert_eq!(
        a.embed("Ontology is the study of being").await.unwrap(),
        b.embed("Ontology is the study of being").await.unwrap()
    );
}
