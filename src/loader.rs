// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! DSL loader and validator: turns a YAML document into a compiled
//! [`Process`], enforcing every structural rule before any agent is
//! instantiated. Grounded on the teacher's
//! `infrastructure::workflow_parser::WorkflowParser`, which follows the
//! same load-then-validate-then-compile shape; this module drops the
//! Kubernetes-manifest envelope (`apiVersion`/`kind`/`metadata`) the
//! teacher's YAML carries, since this DSL's top-level surface is flat.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::agent::{AgentKind, AgentNode};
use crate::error::{DslError, Location};
use crate::evaluator;
use crate::tools::ToolManifest;
use crate::tools::ToolRegistry;

pub const END: &str = "__end__";

/// The six tags `AgentKind` accepts, checked against the raw `kind` field
/// before the whole agent is deserialized so an unknown or missing kind can
/// be reported against its own `agents.<name>` location rather than surfacing
/// as a bare YAML parse error.
const AGENT_KINDS: &[&str] = &[
    "llm",
    "deterministic",
    "reflection",
    "tool_using",
    "supervisor",
    "utcp_agent",
];

/// Fields each kind requires, checked the same way and for the same reason.
fn required_fields(kind: &str) -> &'static [&'static str] {
    match kind {
        "llm" => &["model_name", "prompt_template", "output_key"],
        "deterministic" => &["function"],
        "reflection" => &["model_name", "prompt_template"],
        "tool_using" => &["model_name", "tools", "prompt_template", "output_key"],
        "supervisor" => &["model_name", "available_agents", "prompt_template"],
        "utcp_agent" => &["model_name", "tools", "prompt_template", "output_key"],
        _ => &[],
    }
}

/// Raw top-level YAML shape, deserialized before any cross-reference is
/// checked. `agents` stays untyped here so [`compile_agents`] can attach a
/// precise [`Location`] to an unknown `kind` or a missing field before
/// handing each entry to `AgentNode`'s tagged-enum deserializer.
#[derive(Debug, Deserialize)]
struct RawManifest {
    process: ProcessSection,
    agents: HashMap<String, YamlValue>,
    #[serde(default)]
    edges: Vec<EdgeSection>,
    #[serde(default)]
    tools: HashMap<String, ToolManifest>,
}

/// Typed top-level shape, used once every agent has been validated and
/// decoded, and for re-serializing a compiled [`Process`] back to YAML.
#[derive(Debug, Deserialize, Serialize)]
struct Manifest {
    process: ProcessSection,
    agents: HashMap<String, AgentNode>,
    #[serde(default)]
    edges: Vec<EdgeSection>,
    #[serde(default)]
    tools: HashMap<String, ToolManifest>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ProcessSection {
    name: String,
    start: String,
    #[serde(default)]
    done_condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct EdgeSection {
    from: String,
    to: String,
    #[serde(default)]
    condition: Option<String>,
}

/// One compiled, validated edge.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<String>,
}

/// The compiled, validated process definition. Immutable for its lifetime.
#[derive(Debug)]
pub struct Process {
    pub name: String,
    pub start: String,
    pub done_condition: Option<String>,
    pub agents: HashMap<String, AgentNode>,
    pub edges: Vec<Edge>,
    pub tool_manifests: HashMap<String, ToolManifest>,
}

/// Load and validate a process definition from a YAML string against the
/// given tool registry, running every structural check before returning a
/// compiled graph. Never returns a partially-built [`Process`].
pub fn load(yaml: &str, registry: &dyn ToolRegistry) -> Result<Process, DslError> {
    let raw: RawManifest = serde_yaml::from_str(yaml)?;
    let agents = compile_agents(raw.agents)?;
    let manifest = Manifest {
        process: raw.process,
        agents,
        edges: raw.edges,
        tools: raw.tools,
    };
    validate_and_compile(manifest, registry)
}

/// Checks every agent's `kind` against [`AGENT_KINDS`] and its
/// [`required_fields`] before decoding it, so a malformed agent is rejected
/// with a located [`DslError::UnknownAgentKind`] or
/// [`DslError::MissingField`] instead of an opaque YAML parse error.
fn compile_agents(
    raw_agents: HashMap<String, YamlValue>,
) -> Result<HashMap<String, AgentNode>, DslError> {
    let mut agents = HashMap::with_capacity(raw_agents.len());
    for (name, value) in raw_agents {
        let kind = value
            .get("kind")
            .and_then(YamlValue::as_str)
            .ok_or_else(|| DslError::MissingField {
                location: Location::Field {
                    agent: name.clone(),
                    field: "kind".to_string(),
                },
            })?;

        if !AGENT_KINDS.contains(&kind) {
            return Err(DslError::UnknownAgentKind {
                location: Location::Agent(name.clone()),
                kind: kind.to_string(),
            });
        }

        for field in required_fields(kind) {
            let present = value.get(*field).map(|v| !v.is_null()).unwrap_or(false);
            if !present {
                return Err(DslError::MissingField {
                    location: Location::Field {
                        agent: name.clone(),
                        field: (*field).to_string(),
                    },
                });
            }
        }

        let node: AgentNode = serde_yaml::from_value(value)?;
        agents.insert(name, node);
    }
    Ok(agents)
}

fn validate_and_compile(
    manifest: Manifest,
    registry: &dyn ToolRegistry,
) -> Result<Process, DslError> {
    // Rule 1: `edges` is required unless a supervisor agent exists.
    let has_supervisor = manifest
        .agents
        .values()
        .any(|node| matches!(node.kind, AgentKind::Supervisor(_)));
    if manifest.edges.is_empty() && !has_supervisor {
        return Err(DslError::EdgesRequired);
    }

    // Rule 2: process.start must name a defined agent.
    if !manifest.agents.contains_key(&manifest.process.start) {
        return Err(DslError::UnknownStart(manifest.process.start.clone()));
    }

    // Rule 9 (done_condition half): must parse.
    if let Some(expr) = &manifest.process.done_condition {
        evaluator::validate_syntax(expr)
            .map_err(|source| DslError::InvalidCondition { location: Location::Process, source })?;
    }

    // Rule 4, 5, 6, 7: per-agent shape and tool/function references.
    for (name, node) in &manifest.agents {
        validate_agent(name, node, &manifest.tools, registry)?;
    }

    // Rule 8: supervisor.available_agents references.
    for (name, node) in &manifest.agents {
        if let AgentKind::Supervisor(supervisor) = &node.kind {
            for target in &supervisor.available_agents {
                if !manifest.agents.contains_key(target) {
                    return Err(DslError::UnknownSupervisorTarget {
                        location: Location::Agent(name.clone()),
                        name: target.clone(),
                    });
                }
            }
        }
    }

    // Rule 3 and remainder of rule 9: edges.
    let mut edges = Vec::with_capacity(manifest.edges.len());
    for (index, edge) in manifest.edges.into_iter().enumerate() {
        if !manifest.agents.contains_key(&edge.from) {
            return Err(DslError::UnknownEdgeEndpoint {
                location: Location::Edge { index },
                name: edge.from,
            });
        }
        if edge.to != END && !manifest.agents.contains_key(&edge.to) {
            return Err(DslError::UnknownEdgeEndpoint {
                location: Location::Edge { index },
                name: edge.to,
            });
        }
        if let Some(expr) = &edge.condition {
            evaluator::validate_syntax(expr).map_err(|source| DslError::InvalidCondition {
                location: Location::Edge { index },
                source,
            })?;
        }
        edges.push(Edge {
            from: edge.from,
            to: edge.to,
            condition: edge.condition,
        });
    }

    Ok(Process {
        name: manifest.process.name,
        start: manifest.process.start,
        done_condition: manifest.process.done_condition,
        agents: manifest.agents,
        edges,
        tool_manifests: manifest.tools,
    })
}

fn validate_agent(
    name: &str,
    node: &AgentNode,
    tool_manifests: &HashMap<String, ToolManifest>,
    registry: &dyn ToolRegistry,
) -> Result<(), DslError> {
    match &node.kind {
        AgentKind::Deterministic(agent) => {
            if !registry.has_function(&agent.function) {
                return Err(DslError::UnknownFunction {
                    location: Location::Field {
                        agent: name.to_string(),
                        field: "function".to_string(),
                    },
                    name: agent.function.clone(),
                });
            }
        }
        AgentKind::ToolUsing(agent) => {
            for tool in &agent.tools {
                if !registry.has_tool(tool) {
                    return Err(DslError::UnknownTool {
                        location: Location::Field {
                            agent: name.to_string(),
                            field: "tools".to_string(),
                        },
                        name: tool.clone(),
                    });
                }
            }
        }
        AgentKind::UtcpAgent(agent) => {
            for tool in &agent.tools {
                if !tool_manifests.contains_key(tool) {
                    return Err(DslError::UnknownToolManifest {
                        location: Location::Field {
                            agent: name.to_string(),
                            field: "tools".to_string(),
                        },
                        name: tool.clone(),
                    });
                }
            }
        }
        AgentKind::Llm(_) | AgentKind::Reflection(_) | AgentKind::Supervisor(_) => {}
    }
    Ok(())
}

/// Re-serialize a compiled process to the canonical YAML shape. Used by the
/// loader's own round-trip test, matching the teacher's
/// `WorkflowParser::to_yaml`.
pub fn to_yaml(process: &Process) -> Result<String, DslError> {
    let manifest = Manifest {
        process: ProcessSection {
            name: process.name.clone(),
            start: process.start.clone(),
            done_condition: process.done_condition.clone(),
        },
        agents: process.agents.clone(),
        edges: process
            .edges
            .iter()
            .map(|e| EdgeSection {
                from: e.from.clone(),
                to: e.to.clone(),
                condition: e.condition.clone(),
            })
            .collect(),
        tools: process.tool_manifests.clone(),
    };
    serde_yaml::to_string(&manifest).map_err(DslError::from)
}
