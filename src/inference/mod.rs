// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Text generation: the model trait the answerer talks to, and the llama.cpp engine
pub mod engine;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use engine::{EngineConfig, LlmEngine};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Model emitted its end-of-sequence token
    Stop,
    /// `max_new_tokens` reached
    Length,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub text: String,
    pub tokens_generated: usize,
    pub finish_reason: FinishReason,
}

/// A text-completion model
///
/// Implementations must be safe to share across request handlers; they
/// decide themselves whether concurrent calls run in parallel or queue.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput>;

    fn model_name(&self) -> &str;
}
