// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::{FinishReason, GenerationOutput, GenerationRequest, GenerativeModel};
use crate::config::GenerationConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use llama_cpp_2::{
    context::params::LlamaContextParams,
    llama_backend::LlamaBackend,
    llama_batch::LlamaBatch,
    model::{params::LlamaModelParams, AddBos, LlamaModel, Special},
    sampling::LlamaSampler,
};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sanitize prompt text for tokenization
///
/// Removes characters that cause issues with C string handling in llama.cpp:
/// - Null bytes (\0) - C strings use null as terminator
/// - Other C0 control characters except tab, newline and carriage return
///
/// Retrieved context comes straight out of PDFs, which regularly carry
/// embedded nulls and form feeds.
fn sanitize_prompt_for_tokenizer(prompt: &str) -> String {
    prompt
        .chars()
        .filter(|c| *c != '\0' && (*c >= ' ' || *c == '\t' || *c == '\n' || *c == '\r'))
        .collect()
}

/// Reassembles text from the byte pieces of generated tokens
///
/// Llama-2 spells characters missing from its vocabulary as byte-fallback
/// tokens (`<0xE2>`, `<0x82>`, `<0xAC>`), so one piece on its own is not
/// always valid UTF-8. An incomplete trailing sequence is held back until
/// the next piece completes it; bytes that can never form a character
/// become U+FFFD.
#[derive(Debug, Default)]
struct TokenTextDecoder {
    pending: Vec<u8>,
}

impl TokenTextDecoder {
    fn push(&mut self, piece: &[u8], output: &mut String) {
        self.pending.extend_from_slice(piece);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    output.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    output.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Truncated sequence at the end: wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            output.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is still pending once generation stops
    fn finish(self, output: &mut String) {
        if !self.pending.is_empty() {
            output.push_str(&String::from_utf8_lossy(&self.pending));
        }
    }
}

// Backend handle must outlive the model it loaded
struct LoadedModel {
    backend: LlamaBackend,
    model: LlamaModel,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model_path: PathBuf,
    pub context_size: usize,
    pub gpu_layers: u32,
    pub batch_size: usize,
}

impl From<&GenerationConfig> for EngineConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            context_size: config.context_size,
            gpu_layers: config.gpu_layers,
            batch_size: config.batch_size,
        }
    }
}

/// One GGUF model loaded through llama.cpp
///
/// The model sits behind a mutex: generations run one at a time on the
/// blocking pool, each with a fresh context.
pub struct LlmEngine {
    config: EngineConfig,
    model: Arc<Mutex<LoadedModel>>,
    model_name: String,
}

impl std::fmt::Debug for LlmEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmEngine")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl LlmEngine {
    /// Load the model file named by `config`
    ///
    /// llama.cpp allows a single backend per process, so a second engine in
    /// the same process fails here.
    pub async fn load(config: EngineConfig) -> Result<Self> {
        if !config.model_path.is_file() {
            return Err(anyhow!(
                "Model file not found: {}",
                config.model_path.display()
            ));
        }
        if config.context_size == 0 {
            return Err(anyhow!("Context size must be greater than 0"));
        }

        let model_name = config
            .model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "llama".to_string());

        info!(
            "Loading GGUF model {} (gpu_layers={}, context_size={})",
            config.model_path.display(),
            config.gpu_layers,
            config.context_size
        );
        let started = Instant::now();

        let path = config.model_path.clone();
        let gpu_layers = config.gpu_layers;
        let loaded = tokio::task::spawn_blocking(move || -> Result<LoadedModel> {
            let backend = LlamaBackend::init()
                .map_err(|e| anyhow!("Failed to initialize backend: {:?}", e))?;
            let model_params = LlamaModelParams::default().with_n_gpu_layers(gpu_layers);
            let model = LlamaModel::load_from_file(&backend, &path, &model_params)
                .map_err(|e| anyhow!("Failed to load model: {:?}", e))?;
            Ok(LoadedModel { backend, model })
        })
        .await
        .context("Model loading task panicked")??;

        info!(
            "Model {} loaded in {:.1}s",
            model_name,
            started.elapsed().as_secs_f32()
        );

        Ok(Self {
            config,
            model: Arc::new(Mutex::new(loaded)),
            model_name,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeModel for LlmEngine {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput> {
        let model = Arc::clone(&self.model);
        let config = self.config.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || {
            let loaded = model
                .lock()
                .map_err(|_| anyhow!("Model mutex poisoned by an earlier generation"))?;
            run_generation(&loaded, &config, &request)
        })
        .await
        .context("Generation task panicked")?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn run_generation(
    loaded: &LoadedModel,
    config: &EngineConfig,
    request: &GenerationRequest,
) -> Result<GenerationOutput> {
    let started = Instant::now();

    let prompt = sanitize_prompt_for_tokenizer(&request.prompt);
    if prompt.len() != request.prompt.len() {
        warn!(
            "Sanitized prompt: removed {} problematic bytes (original: {}, sanitized: {})",
            request.prompt.len() - prompt.len(),
            request.prompt.len(),
            prompt.len()
        );
    }

    let prompt_tokens = loaded
        .model
        .str_to_token(&prompt, AddBos::Always)
        .map_err(|e| anyhow!("Failed to tokenize: {:?}", e))?;
    if prompt_tokens.is_empty() {
        return Err(anyhow!("Prompt produced no tokens"));
    }
    let limit = prompt_tokens.len() + request.max_new_tokens;
    if limit > config.context_size {
        return Err(anyhow!(
            "Prompt of {} tokens plus {} new tokens exceeds context size {}",
            prompt_tokens.len(),
            request.max_new_tokens,
            config.context_size
        ));
    }

    let batch_size = config.batch_size.max(1);
    let ctx_params = LlamaContextParams::default()
        .with_n_ctx(NonZeroU32::new(config.context_size as u32))
        .with_n_batch(batch_size as u32);
    let mut context = loaded
        .model
        .new_context(&loaded.backend, ctx_params)
        .map_err(|e| anyhow!("Failed to create context: {:?}", e))?;

    // Feed the prompt in batch-sized pieces; only the final token needs logits
    let mut batch = LlamaBatch::new(batch_size, 1);
    let last = prompt_tokens.len() - 1;
    for (chunk_idx, chunk) in prompt_tokens.chunks(batch_size).enumerate() {
        batch.clear();
        for (offset, &token) in chunk.iter().enumerate() {
            let pos = chunk_idx * batch_size + offset;
            batch
                .add(token, pos as i32, &[0], pos == last)
                .map_err(|e| anyhow!("Failed to add token to batch: {:?}", e))?;
        }
        context
            .decode(&mut batch)
            .map_err(|e| anyhow!("Decode failed: {:?}", e))?;
    }

    debug!(
        "Starting generation: prompt_tokens={}, max_new_tokens={}, context_size={}",
        prompt_tokens.len(),
        request.max_new_tokens,
        config.context_size
    );

    // Greedy picks the arg-max token, so `temperature` does not change the
    // outcome; it only rescales logits ahead of it. Output is deterministic.
    let mut sampler = LlamaSampler::chain_simple([
        LlamaSampler::temp(request.temperature),
        LlamaSampler::greedy(),
    ]);
    let eos_token = loaded.model.token_eos();

    let mut output = String::new();
    let mut decoder = TokenTextDecoder::default();
    let mut n_cur = prompt_tokens.len();
    let mut finish_reason = FinishReason::Length;

    while n_cur < limit {
        let token = sampler.sample(&context, -1);
        if token == eos_token {
            finish_reason = FinishReason::Stop;
            break;
        }

        match loaded.model.token_to_bytes(token, Special::Plaintext) {
            Ok(piece) => decoder.push(&piece, &mut output),
            // Still decoded below so the model state advances
            Err(e) => warn!("Token {} has no text piece, skipped: {:?}", token, e),
        }

        batch.clear();
        batch
            .add(token, n_cur as i32, &[0], true)
            .map_err(|e| anyhow!("Failed to add token: {:?}", e))?;
        context
            .decode(&mut batch)
            .map_err(|e| anyhow!("Decode failed: {:?}", e))?;

        n_cur += 1;
    }

    decoder.finish(&mut output);

    let tokens_generated = n_cur - prompt_tokens.len();
    info!(
        "Generation finished: tokens={}, chars={}, reason={:?}, {:.2}s",
        tokens_generated,
        output.len(),
        finish_reason,
        started.elapsed().as_secs_f32()
    );

    Ok(GenerationOutput {
        text: output,
        tokens_generated,
        finish_reason,
    })
}
