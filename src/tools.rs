// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The tool-registry collaborator contract and the HTTP tool manifest
//! shape used by `utcp_agent`. Grounded on the teacher's
//! `infrastructure::tool_router::ToolRouter`, simplified down to the
//! single lookup-and-invoke operation the core contracts on; MCP
//! session/lifecycle management is orchestrator-mediated infrastructure
//! this crate does not own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;
use crate::state::{AgentOutput, GlobalState};

/// A caller-supplied lookup of deterministic functions and ReAct-style
/// tool descriptors. Supplied at engine construction; the core never
/// mutates it.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Whether `name` resolves to a `deterministic.function`.
    fn has_function(&self, name: &str) -> bool;

    /// Whether `name` resolves to a `tool_using.tools` entry.
    fn has_tool(&self, name: &str) -> bool;

    /// Invoke a deterministic function against the current state,
    /// returning its delta unchanged.
    async fn call_function(&self, name: &str, state: &GlobalState) -> Result<AgentOutput, AgentError>;

    /// Invoke a named tool inside a ReAct loop with the model-supplied
    /// arguments, returning an observation.
    async fn call_tool(&self, name: &str, args: &Value) -> Result<Value, AgentError>;
}

/// `tools[name]` from the top-level YAML surface: an HTTP manifest for
/// `utcp_agent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManifest {
    pub description: String,
    pub provider_type: String,
    pub provider_config: ProviderConfig,
    pub tools: Vec<ToolOperation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOperation {
    pub name: String,
    pub description: String,
    pub endpoint: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Value,
}

impl ToolManifest {
    pub fn operation(&self, name: &str) -> Option<&ToolOperation> {
        self.tools.iter().find(|op| op.name == name)
    }
}

/// Given a manifest entry, performs the described HTTP call and returns the
/// response body. Out of scope beyond this interface boundary; see
/// `providers::HttpToolProvider` for the default adapter.
#[async_trait]
pub trait HttpToolProvider: Send + Sync {
    async fn invoke(
        &self,
        manifest: &ToolManifest,
        operation: &str,
        args: &Value,
    ) -> Result<Value, AgentError>;
}