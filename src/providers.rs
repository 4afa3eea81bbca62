// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Default collaborator implementations: a generic JSON-over-HTTP model
//! client and HTTP tool provider, so the crate is
//! runnable without a caller writing their own adapters. Grounded on the
//! teacher's `infrastructure::llm::ollama` adapter — a plain `reqwest` POST
//! against a local endpoint, no vendor SDK. Anthropic/OpenAI-specific
//! request shaping is deliberately not reproduced; only the generic,
//! vendor-agnostic shape survives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;
use crate::llm::{GenerationOptions, ModelClient, ModelError, ModelResponse};
use crate::tools::{HttpToolProvider, ToolManifest};

/// Posts `{model, prompt, options}` to a configured base URL and expects
/// back `{"text": "..."}` or `{"json": <value>}`.
pub struct HttpModelClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: &'a GenerationOptions,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Json { json: Value },
    Text { text: String },
}

impl HttpModelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn generate(
        &self,
        model_name: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<ModelResponse, ModelError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(&GenerateRequest {
                model: model_name,
                prompt,
                options,
            })
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModelError::Provider(format!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidJson(e.to_string()))?;

        Ok(match body {
            GenerateResponse::Json { json } => ModelResponse::Json(json),
            GenerateResponse::Text { text } => ModelResponse::Text(text),
        })
    }
}

/// Invokes a `utcp_agent` tool call as an HTTP request against the
/// manifest's `base_url`/`endpoint`/`method`, attaching a bearer token read
/// from the environment variable named by `auth.secret`. The token value
/// never appears in a log line or error message.
pub struct HttpUtcpToolProvider {
    client: reqwest::Client,
}

impl HttpUtcpToolProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpUtcpToolProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpToolProvider for HttpUtcpToolProvider {
    async fn invoke(
        &self,
        manifest: &ToolManifest,
        operation: &str,
        args: &Value,
    ) -> Result<Value, AgentError> {
        let op = manifest
            .operation(operation)
            .ok_or_else(|| AgentError::Tool(format!("no such operation {operation:?} on manifest")))?;

        let url = format!("{}{}", manifest.provider_config.base_url, op.endpoint);
        let method = op
            .method
            .parse::<reqwest::Method>()
            .map_err(|e| AgentError::Tool(format!("invalid HTTP method {:?}: {e}", op.method)))?;

        let mut request = self.client.request(method, &url);
        if manifest.provider_config.auth.kind == "bearer" {
            let token = std::env::var(&manifest.provider_config.auth.secret).map_err(|_| {
                AgentError::Tool(format!(
                    "missing environment variable {:?} for tool auth",
                    manifest.provider_config.auth.secret
                ))
            })?;
            request = request.bearer_auth(token);
        }

        let response = request
            .json(args)
            .send()
            .await
            .map_err(|e| AgentError::Tool(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::Tool(format!(
                "tool endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::InvalidJson(e.to_string()))
    }
}