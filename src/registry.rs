// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The default in-memory `ToolRegistry`. A `HashMap`-backed registry is
//! enough for the simple cases and seed test scenarios; callers with a real
//! tool backend supply their own `ToolRegistry` implementation instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::state::{AgentOutput, GlobalState};
use crate::tools::ToolRegistry;

/// A deterministic function: a pure `state -> delta` mapping.
pub type DeterministicFn = Arc<dyn Fn(&GlobalState) -> AgentOutput + Send + Sync>;

/// A ReAct tool: `args -> observation`, may itself perform I/O.
#[async_trait]
pub trait ReactTool: Send + Sync {
    async fn call(&self, args: &Value) -> Result<Value, AgentError>;
}

/// In-memory registry of deterministic functions and ReAct tools, keyed by
/// name. Construction is the caller's responsibility; this type never
/// mutates itself after being handed to an `Engine`.
#[derive(Default, Clone)]
pub struct InMemoryToolRegistry {
    functions: HashMap<String, DeterministicFn>,
    tools: HashMap<String, Arc<dyn ReactTool>>,
}

impl InMemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(
        mut self,
        name: impl Into<String>,
        function: impl Fn(&GlobalState) -> AgentOutput + Send + Sync + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>, tool: Arc<dyn ReactTool>) -> Self {
        self.tools.insert(name.into(), tool);
        self
    }
}

#[async_trait]
impl ToolRegistry for InMemoryToolRegistry {
    fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    async fn call_function(&self, name: &str, state: &GlobalState) -> Result<AgentOutput, AgentError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| AgentError::UnknownFunction(name.to_string()))?;
        Ok(function(state))
    }

    async fn call_tool(&self, name: &str, args: &Value) -> Result<Value, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::Tool(format!("unknown tool {name:?}")))?;
        tool.call(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn calls_a_registered_deterministic_function() {
        let registry = InMemoryToolRegistry::new().with_function("echo_topic", |state| {
            AgentOutput::with_artifact("topic_copy", state.context.get("topic").cloned().unwrap_or(Value::Null))
        });

        assert!(registry.has_function("echo_topic"));
        assert!(!registry.has_function("missing"));

        let mut state = GlobalState::initial(Default::default());
        state.context.insert("topic".into(), json!("widgets"));

        let output = registry.call_function("echo_topic", &state).await.unwrap();
        assert_eq!(
            output.artifacts.unwrap().get("topic_copy"),
            Some(&json!("widgets"))
        );
    }

    #[tokio::test]
    async fn unregistered_function_is_an_error() {
        let registry = InMemoryToolRegistry::new();
        let state = GlobalState::initial(Default::default());
        assert!(registry.call_function("missing", &state).await.is_err());
    }
}