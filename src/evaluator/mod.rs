// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! The safe condition evaluator: a closed boolean DSL over `GlobalState`,
//! with no function calls beyond the whitelisted `len`, no attribute
//! traversal outside `quality`/`artifacts`/`context`, and no dynamic code
//! execution. Syntax is rejected at load time (`validate_syntax`);
//! evaluation failures at routing time are treated as the owning edge
//! simply not matching.

mod ast;
mod eval;
mod lexer;
mod parser;

use crate::error::ExpressionError;
use crate::state::GlobalState;

/// Parse `src` without evaluating it. Used by the loader to validate every
/// `condition` and `done_condition` at load time.
pub fn validate_syntax(src: &str) -> Result<(), ExpressionError> {
    parser::parse(src).map(|_| ())
}

/// Parse and evaluate `src` against `state`. Pure and total: it either
/// returns a boolean or a single `ExpressionError` variant, never panics.
pub fn evaluate(src: &str, state: &GlobalState) -> Result<bool, ExpressionError> {
    let expr = parser::parse(src)?;
    eval::evaluate(&expr, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn validate_syntax_accepts_grammar_and_rejects_garbage() {
        assert!(validate_syntax("quality.attempts < 3 and not artifacts.draft is None").is_ok());
        assert!(validate_syntax("env.SECRET == 1").is_err());
        assert!(validate_syntax("quality.a ===").is_err());
    }

    #[test]
    fn evaluate_is_pure_and_does_not_mutate_state() {
        let state = GlobalState::initial(Map::new());
        let before = state.clone();
        let _ = evaluate("quality.missing is None", &state);
        assert_eq!(state, before);
    }
}