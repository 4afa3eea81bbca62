// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end seed scenarios, each driving a real `Engine` over a scripted
//! `ModelClient` test double. These complement the unit-level
//! loader/evaluator/state tests co-located with their modules.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowcraft_core::error::AgentError;
use flowcraft_core::llm::{GenerationOptions, ModelClient, ModelError, ModelResponse};
use flowcraft_core::registry::InMemoryToolRegistry;
use flowcraft_core::runtime::Engine;
use flowcraft_core::tools::{HttpToolProvider, ToolManifest};
use serde_json::{Map, Value};

struct ScriptedModel {
    responses: Mutex<Vec<ModelResponse>>,
    calls: Mutex<usize>,
}

impl ScriptedModel {
    fn new(responses: Vec<&str>) -> Self {
        let mut responses: Vec<ModelResponse> = responses
            .into_iter()
            .map(|s| ModelResponse::Text(s.to_string()))
            .collect();
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(0),
        }
    }

    fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
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
            .ok_or_else(|| ModelError::Provider("scripted model ran out of responses".into()))
    }
}

struct NoopHttp;

#[async_trait]
impl HttpToolProvider for NoopHttp {
    async fn invoke(
        &self,
        _manifest: &ToolManifest,
        _operation: &str,
        _args: &Value,
    ) -> Result<Value, AgentError> {
        unimplemented!("no utcp_agent in these scenarios")
    }
}

/// Scenario 1: linear copy pipeline with a refinement loop. The back-edge
/// `review -> adapt -> review` is taken twice before approval, for 8 total
/// model calls and a final `artifacts.copy_canais` — see `DESIGN.md` for
/// why this crate settled on that shape over the alternative
/// `review -> generate -> review` fixture.
const LINEAR_PIPELINE_YAML: &str = r#"
process:
  name: copy-pipeline
  start: analyze
agents:
  analyze:
    kind: llm
    model_name: test-model
    prompt_template: "Analyze: {context[topic]}"
    output_key: analysis
  consolidate:
    kind: llm
    model_name: test-model
    prompt_template: "Consolidate: {artifacts[analysis]}"
    output_key: consolidated
  generate:
    kind: llm
    model_name: test-model
    prompt_template: "Generate copy from: {artifacts[consolidated]}"
    output_key: copy_principal
  review:
    kind: reflection
    model_name: test-model
    prompt_template: "Review: {artifacts[copy_principal]}"
  adapt:
    kind: llm
    model_name: test-model
    prompt_template: "Adapt for channels: {artifacts[copy_principal]} ({quality[feedback]})"
    output_key: copy_canais
edges:
  - from: analyze
    to: consolidate
  - from: consolidate
    to: generate
  - from: generate
    to: review
  - from: review
    to: adapt
    condition: "quality.review_status == 'REFINAR' and quality.attempts < 3"
  - from: review
    to: __end__
    condition: "quality.review_status == 'APROVADO'"
  - from: adapt
    to: review
"#;

#[tokio::test]
async fn linear_pipeline_with_refinement_loop() {
    let model = Arc::new(ScriptedModel::new(vec![
        "Raw market analysis",        // analyze
        "Consolidated brief",         // consolidate
        "Principal copy draft",       // generate -> copy_principal
        "REFINAR: needs more punch",  // review #1
        "Adapted copy, round one",    // adapt #1
        "REFINAR: almost there",      // review #2
        "Adapted copy for channels",  // adapt #2 -> final copy_canais
        "APROVADO: ship it",          // review #3
    ]));
    let tools = Arc::new(InMemoryToolRegistry::new());
    let http = Arc::new(NoopHttp);

    let engine =
        Engine::from_yaml_str(LINEAR_PIPELINE_YAML, tools, model.clone(), http).unwrap();

    let mut context = Map::new();
    context.insert("topic".to_string(), Value::String("widgets".to_string()));
    let final_state = engine.run(context).await;

    assert_eq!(model.call_count(), 8);
    assert_eq!(
        final_state.artifacts.get("copy_canais").and_then(Value::as_str),
        Some("Adapted copy for channels")
    );
    assert_eq!(
        final_state.quality.get("review_status").and_then(Value::as_str),
        Some("APROVADO")
    );
    // review runs three times (REFINAR, REFINAR, APROVADO); attempts
    // increments on every reflection, not only on REFINAR.
    assert_eq!(
        final_state.quality.get("attempts").and_then(Value::as_i64),
        Some(3)
    );
}

/// Scenario 2: plan-and-execute. A purely linear chain of four `llm`
/// agents, each writing one artifact.
const PLAN_AND_EXECUTE_YAML: &str = r#"
process:
  name: plan-and-execute
  start: plan
agents:
  plan:
    kind: llm
    model_name: test-model
    prompt_template: "Plan: {context[goal]}"
    output_key: plan
  execute:
    kind: llm
    model_name: test-model
    prompt_template: "Execute: {artifacts[plan]}"
    output_key: execution
  review:
    kind: llm
    model_name: test-model
    prompt_template: "Approve: {artifacts[execution]}"
    output_key: approval
  finalize:
    kind: llm
    model_name: test-model
    prompt_template: "Finalize: {artifacts[execution]} ({artifacts[approval]})"
    output_key: final_article
edges:
  - from: plan
    to: execute
  - from: execute
    to: review
  - from: review
    to: finalize
  - from: finalize
    to: __end__
"#;

#[tokio::test]
async fn plan_and_execute_linear_chain() {
    let model = Arc::new(ScriptedModel::new(vec![
        "Three-step plan",
        "Execution payload",
        "Approved",
        "The final article content.",
    ]));
    let tools = Arc::new(InMemoryToolRegistry::new());
    let http = Arc::new(NoopHttp);

    let engine =
        Engine::from_yaml_str(PLAN_AND_EXECUTE_YAML, tools, model.clone(), http).unwrap();
    let final_state = engine.run(Map::new()).await;

    assert_eq!(model.call_count(), 4);
    assert_eq!(
        final_state.artifacts.get("final_article").and_then(Value::as_str),
        Some("The final article content.")
    );
}
