// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prompt templates with named `{slot}` markers
//!
//! Rendering walks the template once from left to right. Substituted values
//! are copied verbatim, so a `{question}` typed by a user inside the question
//! itself stays literal text. Braces around names that are not declared
//! slots are also left untouched.

use crate::rag::errors::{RagError, RagResult};

const B_INST: &str = "[INST]";
const E_INST: &str = "[/INST]";
const B_SYS: &str = "<<SYS>>\n";
const E_SYS: &str = "\n<</SYS>>\n\n";

const QA_SYSTEM_PROMPT: &str = "Use the following pieces of information to answer the user's question.\n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

const QA_INSTRUCTION: &str = "Context: {context}\n\
Question: {question}\n\n\
Only return the helpful answer below and nothing else.\n\
Helpful answer:";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, respectful and honest assistant. \
Always answer as helpfully as possible, while being safe. \
If a question does not make any sense, or is not factually coherent, explain why instead of \
answering something not correct. If you don't know the answer to a question, please don't \
share false information.";

const TRANSLATION_INSTRUCTION: &str = "Convert the following text from English to French: \n{text}";

pub const CONTEXT_SLOT: &str = "context";
pub const QUESTION_SLOT: &str = "question";
pub const TEXT_SLOT: &str = "text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
    slots: Vec<String>,
}

impl PromptTemplate {
    /// Template with the given slot names; every slot must appear at least once
    pub fn new(template: impl Into<String>, slots: &[&str]) -> RagResult<Self> {
        let template = template.into();
        for slot in slots {
            if !template.contains(&format!("{{{}}}", slot)) {
                return Err(RagError::Config(format!(
                    "Prompt template is missing the {{{}}} slot",
                    slot
                )));
            }
        }
        Ok(Self {
            template,
            slots: slots.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Question-answering template with `{context}` and `{question}` slots
    pub fn question_answering(template: impl Into<String>) -> RagResult<Self> {
        Self::new(template, &[CONTEXT_SLOT, QUESTION_SLOT])
    }

    /// Llama-2 chat format answering strictly from the supplied context
    pub fn llama2_qa() -> Self {
        Self {
            template: llama2_chat(QA_SYSTEM_PROMPT, QA_INSTRUCTION),
            slots: vec![CONTEXT_SLOT.to_string(), QUESTION_SLOT.to_string()],
        }
    }

    /// Llama-2 chat format English to French translation with a `{text}` slot
    pub fn llama2_translation() -> Self {
        Self {
            template: llama2_chat(DEFAULT_SYSTEM_PROMPT, TRANSLATION_INSTRUCTION),
            slots: vec![TEXT_SLOT.to_string()],
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Substitute every declared slot in a single pass
    ///
    /// # Errors
    /// A declared slot without a value in `values`.
    pub fn render(&self, values: &[(&str, &str)]) -> RagResult<String> {
        for slot in &self.slots {
            if !values.iter().any(|(name, _)| name == slot) {
                return Err(RagError::Config(format!("No value for prompt slot {{{}}}", slot)));
            }
        }

        let mut rendered = String::with_capacity(
            self.template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>(),
        );
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let substituted = after.find('}').and_then(|close| {
                let name = &after[..close];
                self.slots
                    .iter()
                    .any(|slot| slot == name)
                    .then(|| values.iter().find(|(n, _)| *n == name))
                    .flatten()
                    .map(|(_, value)| (*value, close))
            });

            match substituted {
                Some((value, close)) => {
                    rendered.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);

        Ok(rendered)
    }

    /// Shorthand for the `{context}` / `{question}` pair
    pub fn render_qa(&self, context: &str, question: &str) -> RagResult<String> {
        self.render(&[(CONTEXT_SLOT, context), (QUESTION_SLOT, question)])
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::llama2_qa()
    }
}

fn llama2_chat(system: &str, instruction: &str) -> String {
    format!("{}{}{}{}{}{}", B_INST, B_SYS, system, E_SYS, instruction, E_INST)
}
