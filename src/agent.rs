// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The closed agent-kind variant and its shared `execute` operation.
//! Grounded on the teacher's `domain::agent::AgentKind`/`AgentRuntime`
//! dispatch, which the teacher already models as a tagged enum rather
//! than an open trait hierarchy — this crate keeps that shape and
//! replaces the teacher's Kubernetes-manifest fields with the six kinds
//! a process-orchestration node actually needs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;
use crate::llm::{GenerationOptions, ModelClient, ModelResponse};
use crate::prompt;
use crate::state::{AgentOutput, GlobalState};
use crate::tools::{HttpToolProvider, ToolManifest, ToolRegistry};

/// Everything a node needs to reach its collaborators. Borrowed for the
/// duration of one `execute` call; the runtime owns the collaborators for
/// the life of the engine.
pub struct AgentContext<'a> {
    pub model: &'a dyn ModelClient,
    pub tools: &'a dyn ToolRegistry,
    pub http: &'a dyn HttpToolProvider,
    pub tool_manifests: &'a HashMap<String, ToolManifest>,
    /// Implementation-defined bound on the ReAct loop, distinct from the
    /// runtime's per-node visit cap.
    pub step_cap: usize,
    /// Engine-wide request defaults (`RuntimeConfig::default_request_options`);
    /// each kind overrides only the fields its behavior actually controls.
    pub default_options: &'a GenerationOptions,
}

/// One node in the process graph: an optional human-readable purpose plus
/// its kind-specific behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentNode {
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(flatten)]
    pub kind: AgentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentKind {
    Llm(LlmAgent),
    Deterministic(DeterministicAgent),
    Reflection(ReflectionAgent),
    ToolUsing(ToolUsingAgent),
    Supervisor(SupervisorAgent),
    UtcpAgent(UtcpAgent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAgent {
    pub model_name: String,
    pub prompt_template: String,
    pub output_key: String,
    #[serde(default)]
    pub force_json_output: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicAgent {
    pub function: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionAgent {
    pub model_name: String,
    pub prompt_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsingAgent {
    pub model_name: String,
    pub tools: Vec<String>,
    pub prompt_template: String,
    pub output_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorAgent {
    pub model_name: String,
    pub available_agents: Vec<String>,
    pub prompt_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtcpAgent {
    pub model_name: String,
    pub tools: Vec<String>,
    pub prompt_template: String,
    pub output_key: String,
    #[serde(default)]
    pub force_json_output: bool,
}

/// A single ReAct decision the model is asked to emit in `json_mode`:
/// either a tool invocation or a final answer.
#[derive(Debug, Deserialize)]
struct ReactStep {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    final_answer: Option<Value>,
}

impl AgentNode {
    /// Dispatches to the kind-specific behavior. Never panics and never
    /// returns an `Err`: any internal fault is folded into `quality.error`
    /// by the caller's conversion of the returned [`AgentError`], matching
    /// the `execute(state) -> AgentOutput` contract every kind honors.
    pub async fn execute(&self, state: &GlobalState, ctx: &AgentContext<'_>) -> AgentOutput {
        let result = match &self.kind {
            AgentKind::Llm(agent) => run_llm(agent, state, ctx).await,
            AgentKind::Deterministic(agent) => run_deterministic(agent, state, ctx).await,
            AgentKind::Reflection(agent) => run_reflection(agent, state, ctx).await,
            AgentKind::ToolUsing(agent) => run_tool_using(agent, state, ctx).await,
            AgentKind::Supervisor(agent) => run_supervisor(agent, state, ctx).await,
            AgentKind::UtcpAgent(agent) => run_utcp(agent, state, ctx).await,
        };

        match result {
            Ok(output) => output,
            Err(err) => AgentOutput::with_error("agent-execution", err),
        }
    }
}

async fn run_llm(
    agent: &LlmAgent,
    state: &GlobalState,
    ctx: &AgentContext<'_>,
) -> Result<AgentOutput, AgentError> {
    let rendered = prompt::render(&agent.prompt_template, state);
    let options = GenerationOptions {
        json_mode: agent.force_json_output,
        ..ctx.default_options.clone()
    };
    let response = ctx
        .model
        .generate(&agent.model_name, &rendered, &options)
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

    let value = response_to_artifact(&response, agent.force_json_output)?;
    Ok(AgentOutput::with_artifact(agent.output_key.clone(), value))
}

async fn run_deterministic(
    agent: &DeterministicAgent,
    state: &GlobalState,
    ctx: &AgentContext<'_>,
) -> Result<AgentOutput, AgentError> {
    ctx.tools.call_function(&agent.function, state).await
}

async fn run_reflection(
    agent: &ReflectionAgent,
    state: &GlobalState,
    ctx: &AgentContext<'_>,
) -> Result<AgentOutput, AgentError> {
    let rendered = prompt::render(&agent.prompt_template, state);
    let response = ctx
        .model
        .generate(&agent.model_name, &rendered, ctx.default_options)
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

    let text = response.as_text();
    let status = if text.contains("APROVADO") {
        "APROVADO"
    } else {
        "REFINAR"
    };
    let attempts = state
        .quality
        .get("attempts")
        .and_then(Value::as_i64)
        .unwrap_or(0)
        + 1;

    Ok(AgentOutput::empty()
        .merge_quality("review_status", Value::String(status.to_string()))
        .merge_quality("feedback", Value::String(text))
        .merge_quality("attempts", Value::from(attempts)))
}

async fn run_supervisor(
    agent: &SupervisorAgent,
    state: &GlobalState,
    ctx: &AgentContext<'_>,
) -> Result<AgentOutput, AgentError> {
    let rendered = prompt::render(&agent.prompt_template, state);
    let response = ctx
        .model
        .generate(&agent.model_name, &rendered, ctx.default_options)
        .await
        .map_err(|e| AgentError::Llm(e.to_string()))?;

    let choice = response.as_text().trim().to_string();
    Ok(AgentOutput::empty().merge_quality("next_agent", Value::String(choice)))
}

async fn run_tool_using(
    agent: &ToolUsingAgent,
    state: &GlobalState,
    ctx: &AgentContext<'_>,
) -> Result<AgentOutput, AgentError> {
    let base_prompt = prompt::render(&agent.prompt_template, state);
    let mut scratchpad = String::new();

    for _ in 0..ctx.step_cap {
        let prompt = format!("{base_prompt}\n{scratchpad}");
        let options = GenerationOptions {
            json_mode: true,
            ..ctx.default_options.clone()
        };
        let response = ctx
            .model
            .generate(&agent.model_name, &prompt, &options)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        let step = parse_react_step(&response)?;

        if let Some(answer) = step.final_answer {
            return Ok(AgentOutput::with_artifact(agent.output_key.clone(), answer));
        }

        let Some(tool_name) = step.tool else {
            return Err(AgentError::InvalidJson(
                "ReAct step had neither `tool` nor `final_answer`".to_string(),
            ));
        };
        if !ctx.tools.has_tool(&tool_name) {
            return Err(AgentError::Tool(format!("unknown tool {tool_name:?}")));
        }

        let observation = ctx.tools.call_tool(&tool_name, &step.args).await?;
        scratchpad.push_str(&format!(
            "\nAction: {tool_name}\nObservation: {observation}\n"
        ));
    }

    Err(AgentError::StepCapExceeded)
}

async fn run_utcp(
    agent: &UtcpAgent,
    state: &GlobalState,
    ctx: &AgentContext<'_>,
) -> Result<AgentOutput, AgentError> {
    let base_prompt = prompt::render(&agent.prompt_template, state);
    let mut scratchpad = String::new();

    for _ in 0..ctx.step_cap {
        let prompt = format!("{base_prompt}\n{scratchpad}");
        let options = GenerationOptions {
            json_mode: true,
            ..ctx.default_options.clone()
        };
        let response = ctx
            .model
            .generate(&agent.model_name, &prompt, &options)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        let step = parse_react_step(&response)?;

        if let Some(answer) = step.final_answer {
            let value = if agent.force_json_output {
                answer
            } else {
                Value::String(value_to_text(&answer))
            };
            return Ok(AgentOutput::with_artifact(agent.output_key.clone(), value));
        }

        let Some(tool_name) = step.tool else {
            return Err(AgentError::InvalidJson(
                "ReAct step had neither `tool` nor `final_answer`".to_string(),
            ));
        };
        let manifest = ctx
            .tool_manifests
            .get(&tool_name)
            .ok_or_else(|| AgentError::Tool(format!("unknown tool manifest {tool_name:?}")))?;

        let observation = ctx.http.invoke(manifest, &tool_name, &step.args).await?;
        scratchpad.push_str(&format!(
            "\nAction: {tool_name}\nObservation: {observation}\n"
        ));
    }

    Err(AgentError::StepCapExceeded)
}

fn parse_react_step(response: &ModelResponse) -> Result<ReactStep, AgentError> {
    let value = match response {
        ModelResponse::Json(v) => v.clone(),
        ModelResponse::Text(t) => {
            serde_json::from_str(t).map_err(|e| AgentError::InvalidJson(e.to_string()))?
        }
    };
    serde_json::from_value(value).map_err(|e| AgentError::InvalidJson(e.to_string()))
}

fn response_to_artifact(response: &ModelResponse, force_json: bool) -> Result<Value, AgentError> {
    if force_json {
        match response {
            ModelResponse::Json(v) => Ok(v.clone()),
            ModelResponse::Text(t) => {
                serde_json::from_str(t).map_err(|e| AgentError::InvalidJson(e.to_string()))
            }
        }
    } else {
        Ok(Value::String(response.as_text()))
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}