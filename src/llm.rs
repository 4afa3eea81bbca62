// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The model-client collaborator contract, consumed by the
//! `llm`, `reflection`, `tool_using`, `supervisor`, and `utcp_agent` agent
//! kinds. Grounded on the teacher's `domain::llm::LLMProvider`
//! anti-corruption trait, trimmed to the one synchronous call the core
//! actually needs — vendor adapters (OpenAI, Anthropic, Ollama SDKs) stay
//! out of scope; see `providers::HttpModelClient` for the one default
//! implementation this crate ships.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options accompanying a generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub json_mode: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// What a model call returns: free text, or structured data when
/// `json_mode` was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelResponse {
    Text(String),
    Json(Value),
}

impl ModelResponse {
    pub fn as_text(&self) -> String {
        match self {
            ModelResponse::Text(t) => t.clone(),
            ModelResponse::Json(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("response was not valid JSON: {0}")]
    InvalidJson(String),
}

/// `(model_name, rendered_prompt, options) -> text-or-structured`.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        model_name: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ModelResponse, ModelError>;
}