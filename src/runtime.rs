// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The graph runtime and the `Engine` facade. Grounded on the teacher's
//! `application::workflow_engine::WorkflowEngine` tick loop — a
//! step/route/merge cycle over a shared state — generalized here to a
//! single-active-node contract (no `Arc<RwLock<_>>` shared execution
//! state; `GlobalState` is produced anew each step) with its own loop
//! guard and edge-ordering rules.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::agent::AgentContext;
use crate::error::{DslError, EngineError};
use crate::evaluator;
use crate::llm::{GenerationOptions, ModelClient};
use crate::loader::{self, Process, END};
use crate::state::{AgentOutput, GlobalState, Message};
use crate::tools::{HttpToolProvider, ToolRegistry};

/// Engine-wide knobs that are not part of the process description itself.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Per-node visit cap before the loop guard trips (design default: 50).
    pub visit_cap: usize,
    /// Bound on the ReAct loop inside `tool_using`/`utcp_agent`, distinct
    /// from `visit_cap`.
    pub step_cap: usize,
    pub default_request_options: GenerationOptions,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            visit_cap: 50,
            step_cap: 6,
            default_request_options: GenerationOptions::default(),
        }
    }
}

/// A minimal, home-grown cancellation flag. The crate does
/// not otherwise depend on `tokio-util`, so a shared `AtomicBool` stands in
/// for `tokio_util::sync::CancellationToken` rather than pulling in the
/// whole crate for one flag.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fired once per step with the edge the runtime chose, for callers who
/// want to mirror a run without intercepting `GlobalState`. Grounded on
/// the teacher's `SupervisorObserver` hook.
pub trait Reporter: Send + Sync {
    fn on_step(&self, node: &str, chosen_edge: Option<&str>) {
        let _ = (node, chosen_edge);
    }
}

/// A `Reporter` that emits `tracing` events and nothing else.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_step(&self, node: &str, chosen_edge: Option<&str>) {
        trace!(node, ?chosen_edge, "step reported");
    }
}

/// Drives one process end-to-end, implementing the step contract exactly.
pub struct GraphRuntime {
    process: Process,
    model: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolRegistry>,
    http: Arc<dyn HttpToolProvider>,
    config: RuntimeConfig,
    reporter: Arc<dyn Reporter>,
}

impl GraphRuntime {
    pub fn new(
        process: Process,
        model: Arc<dyn ModelClient>,
        tools: Arc<dyn ToolRegistry>,
        http: Arc<dyn HttpToolProvider>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            process,
            model,
            tools,
            http,
            config,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Runs to termination with no cancellation signal available.
    pub async fn run(&self, initial_context: Map<String, Value>) -> GlobalState {
        self.run_cancellable(initial_context, &CancellationToken::new()).await
    }

    /// Runs to termination, checking `token` at the top of every step.
    pub async fn run_cancellable(
        &self,
        initial_context: Map<String, Value>,
        token: &CancellationToken,
    ) -> GlobalState {
        let mut state = GlobalState::initial(initial_context);
        let mut current = self.process.start.clone();
        let mut visits: HashMap<String, usize> = HashMap::new();

        loop {
            if token.is_cancelled() {
                debug!("cancellation observed; terminating run");
                state = state.apply(&AgentOutput {
                    messages: Some(vec![Message::new("__runtime__", "cancelled", Value::Null)]),
                    ..Default::default()
                });
                break;
            }

            if current == END {
                trace!("reached __end__");
                break;
            }

            if let Some(expr) = &self.process.done_condition {
                if matches!(evaluator::evaluate(expr, &state), Ok(true)) {
                    debug!(expr, "done_condition satisfied; terminating run");
                    break;
                }
            }

            let visit_count = visits.entry(current.clone()).or_insert(0);
            *visit_count += 1;
            if *visit_count > self.config.visit_cap {
                debug!(node = %current, cap = self.config.visit_cap, "loop guard triggered");
                state = state.apply(&AgentOutput::with_error(
                    "loop-guard",
                    format!("node {current:?} exceeded the visit cap of {}", self.config.visit_cap),
                ));
                break;
            }

            let node = self
                .process
                .agents
                .get(&current)
                .expect("current always names a defined agent: the loader validated every edge endpoint");

            debug!(node = %current, purpose = ?node.purpose, "dispatching agent");
            let ctx = AgentContext {
                model: self.model.as_ref(),
                tools: self.tools.as_ref(),
                http: self.http.as_ref(),
                tool_manifests: &self.process.tool_manifests,
                step_cap: self.config.step_cap,
                default_options: &self.config.default_request_options,
            };

            let mut delta = node.execute(&state, &ctx).await;
            let mut messages = delta.messages.take().unwrap_or_default();
            messages.push(Message::new(current.clone(), "step", Value::Null));
            delta.messages = Some(messages);
            state = state.apply(&delta);

            match select_edge(&self.process.edges, &current, &state) {
                Some(to) => {
                    self.reporter.on_step(&current, Some(&to));
                    current = to;
                }
                None => {
                    debug!(node = %current, "no matching outgoing edge; terminating run");
                    self.reporter.on_step(&current, None);
                    break;
                }
            }
        }

        state
    }
}

/// Edge selection: first matching conditioned edge wins; the first
/// unconditional edge for `from` is the fallback. Expression failures are
/// treated as the owning edge not matching.
fn select_edge(edges: &[crate::loader::Edge], from: &str, state: &GlobalState) -> Option<String> {
    let mut fallback: Option<&crate::loader::Edge> = None;

    for edge in edges.iter().filter(|e| e.from == from) {
        match &edge.condition {
            Some(expr) => match evaluator::evaluate(expr, state) {
                Ok(true) => return Some(edge.to.clone()),
                Ok(false) | Err(_) => continue,
            },
            None => {
                if fallback.is_none() {
                    fallback = Some(edge);
                }
            }
        }
    }

    fallback.map(|e| e.to.clone())
}

/// Convenience facade combining the loader and the runtime. Construction
/// raises; `run` never does.
pub struct Engine {
    runtime: GraphRuntime,
}

impl Engine {
    pub fn from_yaml_str(
        yaml: &str,
        tools: Arc<dyn ToolRegistry>,
        model: Arc<dyn ModelClient>,
        http: Arc<dyn HttpToolProvider>,
    ) -> Result<Self, DslError> {
        Self::from_yaml_str_with_config(yaml, tools, model, http, RuntimeConfig::default())
    }

    pub fn from_yaml_str_with_config(
        yaml: &str,
        tools: Arc<dyn ToolRegistry>,
        model: Arc<dyn ModelClient>,
        http: Arc<dyn HttpToolProvider>,
        config: RuntimeConfig,
    ) -> Result<Self, DslError> {
        let process = loader::load(yaml, tools.as_ref())?;
        Ok(Self {
            runtime: GraphRuntime::new(process, model, tools, http, config),
        })
    }

    pub fn from_yaml_file(
        path: impl AsRef<Path>,
        tools: Arc<dyn ToolRegistry>,
        model: Arc<dyn ModelClient>,
        http: Arc<dyn HttpToolProvider>,
    ) -> Result<Self, EngineError> {
        let yaml = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&yaml, tools, model, http)?)
    }

    /// Convenience wrapper for callers who want one opaque `anyhow::Error`
    /// instead of matching `EngineError`'s variants — `anyhow` never
    /// appears in a library trait's return type, only here in the
    /// optional facade.
    pub fn from_yaml_file_anyhow(
        path: impl AsRef<Path>,
        tools: Arc<dyn ToolRegistry>,
        model: Arc<dyn ModelClient>,
        http: Arc<dyn HttpToolProvider>,
    ) -> anyhow::Result<Self> {
        Self::from_yaml_file(path, tools, model, http).map_err(anyhow::Error::from)
    }

    /// Runs the loaded process to termination and returns the final state.
    /// Never returns `Result`: every run-time fault lands in
    /// `quality.error` instead.
    pub async fn run(&self, initial_context: Map<String, Value>) -> GlobalState {
        self.runtime.run(initial_context).await
    }

    pub async fn run_cancellable(
        &self,
        initial_context: Map<String, Value>,
        token: &CancellationToken,
    ) -> GlobalState {
        self.runtime.run_cancellable(initial_context, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::llm::{ModelError, ModelResponse};
    use crate::registry::InMemoryToolRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        responses: Mutex<Vec<Result<ModelResponse, ModelError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<ModelResponse, ModelError>>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(
            &self,
            _model_name: &str,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<ModelResponse, ModelError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop()
                .expect("scripted model ran out of responses")
        }
    }

    struct NoopHttp;

    #[async_trait]
    impl HttpToolProvider for NoopHttp {
        async fn invoke(
            &self,
            _manifest: &crate::tools::ToolManifest,
            _operation: &str,
            _args: &Value,
        ) -> Result<Value, AgentError> {
            unimplemented!("no utcp_agent in these tests")
        }
    }

    const UNCONDITIONAL_TERMINATION_YAML: &str = r#"
process:
  name: skip-demo
  start: greet
  done_condition: "context.skip == true"
agents:
  greet:
    kind: llm
    model_name: test-model
    prompt_template: "hi"
    output_key: greeting
edges:
  - from: greet
    to: __end__
"#;

    #[tokio::test]
    async fn done_condition_before_first_step_runs_zero_agents() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let tools = Arc::new(InMemoryToolRegistry::new());
        let http = Arc::new(NoopHttp);

        let engine =
            Engine::from_yaml_str(UNCONDITIONAL_TERMINATION_YAML, tools, model.clone(), http).unwrap();

        let mut context = Map::new();
        context.insert("skip".to_string(), Value::Bool(true));
        let final_state = engine.run(context).await;

        assert_eq!(*model.calls.lock().unwrap(), 0);
        assert_eq!(final_state.messages.len(), 0);
    }

    const SUPERVISOR_ROUTING_YAML: &str = r#"
process:
  name: supervisor-demo
  start: boss
agents:
  boss:
    kind: supervisor
    model_name: test-model
    available_agents: [worker_a, worker_b]
    prompt_template: "route"
  worker_a:
    kind: deterministic
    function: noop
  worker_b:
    kind: deterministic
    function: noop
edges:
  - from: boss
    to: worker_a
    condition: "quality.next_agent == 'worker_a'"
  - from: boss
    to: worker_b
    condition: "quality.next_agent == 'worker_b'"
  - from: boss
    to: __end__
    condition: "quality.next_agent == 'FINISH'"
  - from: worker_a
    to: boss
  - from: worker_b
    to: boss
"#;

    #[tokio::test]
    async fn supervisor_routes_workers_in_scripted_order() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelResponse::Text("worker_a".into())),
            Ok(ModelResponse::Text("worker_b".into())),
            Ok(ModelResponse::Text("FINISH".into())),
        ]));
        let tools = Arc::new(InMemoryToolRegistry::new().with_function("noop", |_| AgentOutput::empty()));
        let http = Arc::new(NoopHttp);

        let engine = Engine::from_yaml_str(SUPERVISOR_ROUTING_YAML, tools, model.clone(), http).unwrap();
        let final_state = engine.run(Map::new()).await;

        let visited: Vec<&str> = final_state.messages.iter().map(|m| m.agent.as_str()).collect();
        assert_eq!(visited, vec!["boss", "worker_a", "boss", "worker_b", "boss"]);
        assert_eq!(*model.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn failing_agent_folds_error_into_state_without_raising() {
        let model = Arc::new(ScriptedModel::new(vec![Err(ModelError::Network(
            "connection refused".to_string(),
        ))]));
        let tools = Arc::new(InMemoryToolRegistry::new());
        let http = Arc::new(NoopHttp);

        let engine =
            Engine::from_yaml_str(UNCONDITIONAL_TERMINATION_YAML, tools, model, http).unwrap();
        let final_state = engine.run(Map::new()).await;

        let error = final_state.quality.get("error").and_then(Value::as_str).unwrap();
        assert!(error.contains("LLM invocation failed"));
    }

    #[test]
    fn invalid_edge_reference_fails_construction() {
        let yaml = UNCONDITIONAL_TERMINATION_YAML.replace("to: __end__", "to: nonexistent");
        let tools = Arc::new(InMemoryToolRegistry::new());
        let model = Arc::new(ScriptedModel::new(vec![]));
        let http = Arc::new(NoopHttp);
        assert!(Engine::from_yaml_str(&yaml, tools, model, http).is_err());
    }
}