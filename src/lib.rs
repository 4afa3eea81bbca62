// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # flowcraft-core
//!
//! A domain-agnostic orchestrator for multi-agent workflows. A *process* is a
//! directed graph of heterogeneous agents connected by conditional edges,
//! described entirely by an external YAML document; this crate loads,
//! validates, and runs that graph without knowing anything about the domain
//! the agents operate in.
//!
//! ## Components
//!
//! | Component | Module |
//! |---|---|
//! | State model | [`state`] |
//! | Safe condition evaluator | [`evaluator`] |
//! | Agent contract and kinds | [`agent`], [`llm`], [`tools`] |
//! | DSL loader and validator | [`loader`] |
//! | Graph runtime | [`runtime`] |
//!
//! Supporting: [`error`] (the error taxonomy), [`registry`] (a default
//! in-memory `ToolRegistry`), [`providers`] (default `ModelClient` /
//! `HttpToolProvider` implementations), [`prompt`] (placeholder rendering).
//!
//! The crate ships the loader, evaluator, and runtime plus one illustrative
//! default implementation of each external collaborator; it does not
//! prescribe an LLM vendor, a persistence layer, or a UI.

pub mod agent;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod loader;
pub mod prompt;
pub mod providers;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod tools;

pub use agent::{AgentContext, AgentKind, AgentNode};
pub use error::{AgentError, DslError, EngineError, ExpressionError};
pub use loader::{Edge, Process};
pub use runtime::{CancellationToken, Engine, GraphRuntime, Reporter, RuntimeConfig};
pub use state::{AgentOutput, GlobalState, Message};
