// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! PDF directory loading against real files on disk

use crate::common::{context_with, minimal_pdf, pdf_with_pages, MockModel};
use fabstir_rag_node::{
    config::RagConfig,
    documents::{DocumentLoader, PdfDirectoryLoader},
    embeddings::HashEmbedder,
    rag::{build_index, RagError, TextSplitter},
};
use std::fs;

#[tokio::test]
async fn test_extracts_text_from_pdf() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("ontology.pdf"),
        minimal_pdf("Ontology is the study of being"),
    )
    .unwrap();

    let loader = PdfDirectoryLoader::new(dir.path(), "*.pdf").unwrap();
    let documents = loader.load().await.unwrap();

    assert_eq!(documents.len(), 1);
    assert!(documents[0].text.contains("Ontology"));
    assert!(documents[0].source.ends_with("ontology.pdf"));
    assert_eq!(documents[0].page, Some(0));
}

#[tokio::test]
async fn test_each_page_is_its_own_document() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("book.pdf"),
        pdf_with_pages(&["Page one text", "Page two text"]),
    )
    .unwrap();

    let loader = PdfDirectoryLoader::new(dir.path(), "*.pdf").unwrap();
    let documents = loader.load().await.unwrap();

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].page, Some(0));
    assert_eq!(documents[1].page, Some(1));
    assert!(documents[0].text.contains("Page one text"));
    assert!(documents[1].text.contains("Page two text"));
    // The last word of a page is never glued to the first word of the next
    for document in &documents {
        assert!(!document.text.contains("textPage"));
        assert!(document.source.ends_with("book.pdf"));
    }

    let segments = TextSplitter::new(500, 50)
        .unwrap()
        .split_documents(&documents);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].page, Some(1));
}

#[tokio::test]
async fn test_blank_pages_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("sparse.pdf"),
        pdf_with_pages(&["Cover", "", "Ontology is the study of being"]),
    )
    .unwrap();

    let loader = PdfDirectoryLoader::new(dir.path(), "*.pdf").unwrap();
    let documents = loader.load().await.unwrap();

    let pages: Vec<_> = documents.iter().map(|d| d.page).collect();
    assert_eq!(pages, vec![Some(0), Some(2)]);
}

#[tokio::test]
async fn test_documents_sorted_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b.pdf"), minimal_pdf("Second document")).unwrap();
    fs::write(dir.path().join("a.pdf"), minimal_pdf("First document")).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a pdf").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("c.pdf"), minimal_pdf("Nested")).unwrap();

    let loader = PdfDirectoryLoader::new(dir.path(), "*.pdf").unwrap();
    let documents = loader.load().await.unwrap();

    assert_eq!(documents.len(), 2);
    assert!(documents[0].source.ends_with("a.pdf"));
    assert!(documents[1].source.ends_with("b.pdf"));
}

#[tokio::test]
async fn test_empty_directory_builds_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let loader = PdfDirectoryLoader::new(dir.path(), "*.pdf").unwrap();

    let index = build_index(
        &loader,
        &TextSplitter::new(500, 50).unwrap(),
        &HashEmbedder::new(384).unwrap(),
    )
    .await
    .unwrap();

    assert!(index.is_empty());
}

#[tokio::test]
async fn test_pdf_to_answer_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("ontology.pdf"),
        minimal_pdf("Ontology is the study of being"),
    )
    .unwrap();

    let documents = PdfDirectoryLoader::new(dir.path(), "*.pdf")
        .unwrap()
        .load()
        .await
        .unwrap();
    let model = MockModel::replying("Ontology is the study of being.");
    let ctx = context_with(documents, model.clone()).await;

    let answer = ctx.qa().answer("What is ontology?").await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert!(answer.sources[0].text.contains("Ontology"));
    assert!(model.requests()[0].prompt.contains("Ontology"));
}

#[tokio::test]
async fn test_missing_directory_reported() {
    let mut config = RagConfig::default();
    config.documents.directory = "/nonexistent/data".into();

    let loader =
        PdfDirectoryLoader::new(&config.documents.directory, &config.documents.glob).unwrap();
    let err = loader.load().await.unwrap_err();
    assert!(matches!(err, RagError::DocumentsDirNotFound(_)));
}
