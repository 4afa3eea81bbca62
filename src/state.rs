// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The immutable global state and the delta algebra that transforms it.
//!
//! Grounded on the teacher's `domain::workflow::Blackboard`: a flat
//! string-keyed map of `serde_json::Value`s that states merge into across a
//! run. This generalizes that single map into four named sections
//! (`context`, `artifacts`, `quality`, `messages`) with one exception to
//! the merge rule (`messages` appends rather than merging).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One entry in the append-only audit log. Never read by the evaluator.
/// Carries its own `id`, matching the teacher's practice
/// of giving every audit-relevant entity (`ExecutionId`, `AgentId`) a
/// `Uuid` rather than relying on list position for identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub agent: String,
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn new(agent: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent: agent.into(),
            kind: kind.into(),
            payload,
            at: Utc::now(),
        }
    }
}

/// The four semantic containers carried through a run, each a mapping from
/// string keys to arbitrary structured values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub artifacts: Map<String, Value>,
    #[serde(default)]
    pub quality: Map<String, Value>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl GlobalState {
    /// Build the initial state for a run: `context` seeded from the
    /// caller-supplied input, everything else empty.
    pub fn initial(context: Map<String, Value>) -> Self {
        Self {
            context,
            artifacts: Map::new(),
            quality: Map::new(),
            messages: Vec::new(),
        }
    }

    /// Produce a new state by deep-merging `delta` into `self`. `self` is
    /// left untouched; the invariant `apply(s, empty) == s` holds because
    /// merging an absent section is a no-op and merging an empty map changes
    /// nothing.
    pub fn apply(&self, delta: &AgentOutput) -> GlobalState {
        let context = match &delta.context {
            Some(d) => deep_merge_maps(&self.context, d),
            None => self.context.clone(),
        };
        let artifacts = match &delta.artifacts {
            Some(d) => deep_merge_maps(&self.artifacts, d),
            None => self.artifacts.clone(),
        };
        let quality = match &delta.quality {
            Some(d) => deep_merge_maps(&self.quality, d),
            None => self.quality.clone(),
        };
        let mut messages = self.messages.clone();
        if let Some(new_messages) = &delta.messages {
            messages.extend(new_messages.iter().cloned());
        }

        GlobalState {
            context,
            artifacts,
            quality,
            messages,
        }
    }

    /// Resolve a dotted/bracketed path against one of the three readable
    /// roots. Used by the evaluator and by prompt-template rendering. A
    /// path that does not resolve yields `None`, which both callers treat
    /// as the null value rather than an error.
    pub fn section(&self, root: &str) -> Option<&Map<String, Value>> {
        match root {
            "context" => Some(&self.context),
            "artifacts" => Some(&self.artifacts),
            "quality" => Some(&self.quality),
            _ => None,
        }
    }

    pub fn resolve_path(&self, root: &str, keys: &[String]) -> Option<Value> {
        let section = self.section(root)?;
        let mut current: &Value = section.get(keys.first()?)?;
        for key in &keys[1..] {
            current = match current {
                Value::Object(map) => map.get(key)?,
                Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i))?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

/// A partial `GlobalState` carrying only the fields an agent wishes to
/// change. A missing field is a no-op, not a clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl AgentOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Convenience constructor for the one artifact an `llm`/`tool_using`/
    /// `utcp_agent` agent writes.
    pub fn with_artifact(key: impl Into<String>, value: Value) -> Self {
        let mut artifacts = Map::new();
        artifacts.insert(key.into(), value);
        Self {
            artifacts: Some(artifacts),
            ..Default::default()
        }
    }

    /// Convenience constructor for `quality.error`, used by the runtime to
    /// fold a caught `AgentError` or `LoopGuardTriggered` into state.
    pub fn with_error(kind: &str, message: impl std::fmt::Display) -> Self {
        let mut quality = Map::new();
        quality.insert("error".to_string(), Value::String(format!("{kind}: {message}")));
        Self {
            quality: Some(quality),
            ..Default::default()
        }
    }

    pub fn merge_quality(mut self, key: impl Into<String>, value: Value) -> Self {
        self.quality.get_or_insert_with(Map::new).insert(key.into(), value);
        self
    }
}

/// Recursive deep merge of two JSON objects: object keys recurse, arrays and
/// scalars are replaced wholesale by the right-hand side.
pub fn deep_merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => Value::Object(deep_merge_maps(a, b)),
        (_, b) => b.clone(),
    }
}

fn deep_merge_maps(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut out = a.clone();
    for (key, b_value) in b {
        match out.get(key) {
            Some(a_value) => {
                let merged = deep_merge(a_value, b_value);
                out.insert(key.clone(), merged);
            }
            None => {
                out.insert(key.clone(), b_value.clone());
            }
        }
    }
    out
}
