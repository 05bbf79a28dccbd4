// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Shared fixtures for integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fabstir_rag_node::{
    config::RagConfig,
    documents::{Document, InMemoryLoader},
    embeddings::HashEmbedder,
    inference::{FinishReason, GenerationOutput, GenerationRequest, GenerativeModel},
    rag::AppContext,
};
use std::sync::{Arc, Mutex};

/// Generative model stand-in that records every request
pub struct MockModel {
    reply: String,
    fail: bool,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockModel {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(anyhow!("llama_decode failed: out of memory"));
        }
        Ok(GenerationOutput {
            text: self.reply.clone(),
            tokens_generated: self.reply.split_whitespace().count(),
            finish_reason: FinishReason::Stop,
        })
    }

    fn model_name(&self) -> &str {
        "mock-llama"
    }
}

/// Context over in-memory documents with the hash embedder
pub async fn context_with(documents: Vec<Document>, model: Arc<MockModel>) -> Arc<AppContext> {
    let config = RagConfig::default();
    let embedder = Arc::new(HashEmbedder::new(config.embedding.dimensions).unwrap());
    let context = AppContext::from_loader(
        config,
        &InMemoryLoader::new(documents),
        embedder,
        model,
    )
    .await
    .unwrap();
    Arc::new(context)
}

/// Single-page PDF with one line of Helvetica text
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    pdf_with_pages(&[text])
}

/// PDF with one line of Helvetica text per page
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    // 1: catalog, 2: page tree, 3: font, then a page and its content stream per page
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + i * 2).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (text, page_id) in pages.iter().zip(&page_ids) {
        let content = format!("BT /F1 12 Tf 72 712 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R \
             /Resources << /Font << /F1 3 0 R >> >> >>",
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.extend_from_slice(xref.as_bytes());
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    pdf
}
