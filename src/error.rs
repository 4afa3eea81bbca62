// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy for the orchestrator core.
//!
//! Only two kinds of fault ever reach a caller as a Rust `Err`:
//! [`DslError`], raised while loading/validating a process definition, and
//! [`ExpressionError`], raised while parsing or evaluating a condition.
//! Everything that happens once a run is underway (agent faults, the loop
//! guard, cancellation) is folded into `quality.error` by the runtime and
//! never surfaces as a `Result::Err` — see `runtime::GraphRuntime::run`.

use thiserror::Error;

/// A location inside a loaded process definition, attached to every
/// [`DslError`] so a caller can point a user at the offending YAML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Agent(String),
    Edge { index: usize },
    Field { agent: String, field: String },
    Process,
    Tool(String),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Agent(name) => write!(f, "agents.{name}"),
            Location::Edge { index } => write!(f, "edges[{index}]"),
            Location::Field { agent, field } => write!(f, "agents.{agent}.{field}"),
            Location::Process => write!(f, "process"),
            Location::Tool(name) => write!(f, "tools.{name}"),
        }
    }
}

/// Structural or reference violation found while loading a process
/// definition. Raised at construction time; the loader never produces a
/// partially-built graph.
#[derive(Debug, Error)]
pub enum DslError {
    #[error("missing required top-level key: {0}")]
    MissingTopLevelKey(&'static str),

    #[error("process.start names undefined agent {0:?}")]
    UnknownStart(String),

    #[error("{location}: edge references undefined agent {name:?}")]
    UnknownEdgeEndpoint { location: Location, name: String },

    #[error("{location}: unknown agent kind {kind:?}")]
    UnknownAgentKind { location: Location, kind: String },

    #[error("{location}: missing required field")]
    MissingField { location: Location },

    #[error("{location}: deterministic.function {name:?} is not registered in the tool registry")]
    UnknownFunction { location: Location, name: String },

    #[error("{location}: tool {name:?} is not registered in the tool registry")]
    UnknownTool { location: Location, name: String },

    #[error("{location}: tool {name:?} has no manifest declared under top-level `tools`")]
    UnknownToolManifest { location: Location, name: String },

    #[error("{location}: supervisor.available_agents references undefined agent {name:?}")]
    UnknownSupervisorTarget { location: Location, name: String },

    #[error("{location}: condition failed to parse: {source}")]
    InvalidCondition {
        location: Location,
        #[source]
        source: ExpressionError,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("edges is required unless the process contains a supervisor agent")]
    EdgesRequired,
}

/// A routing or termination expression that cannot be parsed, or that
/// evaluates against an impossible type. Treated by the runtime as the
/// whole edge being non-matching, never as a process-halting fault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("path must start with quality, artifacts, or context; got {0:?}")]
    ForbiddenRoot(String),

    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    #[error("trailing input after expression: {0:?}")]
    TrailingInput(String),

    #[error("cannot compare incompatible types")]
    IncomparableTypes,
}

/// The only error type a caller ever sees: raised solely from `Engine`
/// construction. Everything that can happen during a run is folded into
/// `quality.error` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Dsl(#[from] DslError),

    #[error("failed to read process definition: {0}")]
    Io(#[from] std::io::Error),
}

/// Any fault surfacing out of an agent's `execute`. Caught by the runtime
/// and converted to a `{ quality: { error: "<kind>: <message>" } }` delta;
/// execution continues at the routing step.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("LLM invocation failed: {0}")]
    Llm(String),

    #[error("tool invocation failed: {0}")]
    Tool(String),

    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    #[error("response could not be parsed as JSON: {0}")]
    InvalidJson(String),

    #[error("tool-using agent exceeded its step cap without a final answer")]
    StepCapExceeded,
}