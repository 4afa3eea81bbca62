// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Evaluates a parsed [`Expr`] against a [`GlobalState`].
//!
//! The state-access rule is enforced once, in the parser (an out-of-grammar
//! root is rejected before an expression is ever evaluated); this module
//! only has to worry about typed comparisons and the null-propagation
//! rules.

use super::ast::{CmpOp, Expr, Literal, Path, Primary};
use crate::error::ExpressionError;
use crate::state::GlobalState;
use serde_json::Value;

/// A resolved intermediate value: either a scalar the grammar can compare,
/// or an opaque container (array/object) that only supports `len()` and
/// null checks.
#[derive(Debug, Clone, PartialEq)]
enum RValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Container(Value),
}

pub fn evaluate(expr: &Expr, state: &GlobalState) -> Result<bool, ExpressionError> {
    Ok(eval_expr(expr, state)?)
}

fn eval_expr(expr: &Expr, state: &GlobalState) -> Result<bool, ExpressionError> {
    match expr {
        Expr::Or(lhs, rhs) => Ok(eval_expr(lhs, state)? || eval_expr(rhs, state)?),
        Expr::And(lhs, rhs) => Ok(eval_expr(lhs, state)? && eval_expr(rhs, state)?),
        Expr::Not(inner) => Ok(!eval_expr(inner, state)?),
        Expr::Cmp(left, rest) => eval_cmp(left, rest, state),
    }
}

fn eval_cmp(
    left: &Primary,
    rest: &Option<(CmpOp, Option<Primary>)>,
    state: &GlobalState,
) -> Result<bool, ExpressionError> {
    let left_value = eval_primary(left, state)?;

    match rest {
        None => Ok(truthy(&left_value)),
        Some((CmpOp::IsNone, _)) => Ok(matches!(left_value, RValue::Null)),
        Some((CmpOp::IsNotNone, _)) => Ok(!matches!(left_value, RValue::Null)),
        Some((op, Some(right))) => {
            let right_value = eval_primary(right, state)?;
            apply_cmp(*op, &left_value, &right_value)
        }
        Some((_, None)) => Err(ExpressionError::UnexpectedEnd),
    }
}

fn truthy(value: &RValue) -> bool {
    match value {
        RValue::Null => false,
        RValue::Bool(b) => *b,
        RValue::Int(n) => *n != 0,
        RValue::Float(n) => *n != 0.0,
        RValue::Str(s) => !s.is_empty(),
        RValue::Container(Value::Array(a)) => !a.is_empty(),
        RValue::Container(Value::Object(o)) => !o.is_empty(),
        RValue::Container(_) => true,
    }
}

fn eval_primary(primary: &Primary, state: &GlobalState) -> Result<RValue, ExpressionError> {
    match primary {
        Primary::Literal(lit) => Ok(literal_to_rvalue(lit)),
        Primary::Path(path) => Ok(resolve(path, state)),
        Primary::Paren(inner) => Ok(RValue::Bool(eval_expr(inner, state)?)),
        Primary::Len(path) => match resolve(path, state) {
            RValue::Null => Ok(RValue::Null),
            RValue::Str(s) => Ok(RValue::Int(s.chars().count() as i64)),
            RValue::Container(Value::Array(a)) => Ok(RValue::Int(a.len() as i64)),
            RValue::Container(Value::Object(o)) => Ok(RValue::Int(o.len() as i64)),
            _ => Err(ExpressionError::IncomparableTypes),
        },
    }
}

fn literal_to_rvalue(lit: &Literal) -> RValue {
    match lit {
        Literal::Int(n) => RValue::Int(*n),
        Literal::Float(n) => RValue::Float(*n),
        Literal::Str(s) => RValue::Str(s.clone()),
        Literal::Bool(b) => RValue::Bool(*b),
        Literal::None => RValue::Null,
    }
}

fn resolve(path: &Path, state: &GlobalState) -> RValue {
    match state.resolve_path(&path.root, &path.keys) {
        None => RValue::Null,
        Some(value) => value_to_rvalue(value),
    }
}

fn value_to_rvalue(value: Value) -> RValue {
    match value {
        Value::Null => RValue::Null,
        Value::Bool(b) => RValue::Bool(b),
        Value::String(s) => RValue::Str(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                RValue::Int(i)
            } else {
                RValue::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        other @ (Value::Array(_) | Value::Object(_)) => RValue::Container(other),
    }
}

fn as_f64(value: &RValue) -> Option<f64> {
    match value {
        RValue::Int(n) => Some(*n as f64),
        RValue::Float(n) => Some(*n),
        _ => None,
    }
}

fn apply_cmp(op: CmpOp, left: &RValue, right: &RValue) -> Result<bool, ExpressionError> {
    match op {
        CmpOp::Eq => Ok(loose_eq(left, right)),
        CmpOp::Ne => Ok(!loose_eq(left, right)),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => order_cmp(op, left, right),
        CmpOp::IsNone | CmpOp::IsNotNone => unreachable!("handled in eval_cmp"),
    }
}

fn loose_eq(left: &RValue, right: &RValue) -> bool {
    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return a == b;
    }
    left == right
}

fn order_cmp(op: CmpOp, left: &RValue, right: &RValue) -> Result<bool, ExpressionError> {
    // Ordering against null never raises; it is simply false.
    if matches!(left, RValue::Null) || matches!(right, RValue::Null) {
        return Ok(false);
    }

    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return Ok(match op {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            _ => unreachable!(),
        });
    }

    if let (RValue::Str(a), RValue::Str(b)) = (left, right) {
        return Ok(match op {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            _ => unreachable!(),
        });
    }

    Err(ExpressionError::IncomparableTypes)
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;
    use serde_json::{json, Map};

    fn state_with(quality: &[(&str, Value)], artifacts: &[(&str, Value)]) -> GlobalState {
        let mut state = GlobalState::initial(Map::new());
        for (k, v) in quality {
            state.quality.insert((*k).to_string(), v.clone());
        }
        for (k, v) in artifacts {
            state.artifacts.insert((*k).to_string(), v.clone());
        }
        state
    }

    fn check(src: &str, state: &GlobalState) -> bool {
        evaluate(&parse(src).unwrap(), state).unwrap()
    }

    #[test]
    fn numeric_and_string_comparisons() {
        let state = state_with(&[("attempts", json!(2))], &[]);
        assert!(check("quality.attempts < 3", &state));
        assert!(!check("quality.attempts >= 3", &state));

        let state = state_with(&[("review_status", json!("APROVADO"))], &[]);
        assert!(check("quality.review_status == 'APROVADO'", &state));
    }

    #[test]
    fn missing_path_is_null_and_ordering_is_false() {
        let state = GlobalState::initial(Map::new());
        assert!(!check("quality.missing == 'x'", &state));
        assert!(check("quality.missing == None", &state));
        assert!(!check("quality.missing < 5", &state));
        assert!(!check("quality.missing > 5", &state));
    }

    #[test]
    fn is_none_and_is_not_none() {
        let state = state_with(&[], &[("draft", json!("hello"))]);
        assert!(!check("artifacts.draft is None", &state));
        assert!(check("artifacts.draft is not None", &state));
        assert!(check("artifacts.missing is None", &state));
    }

    #[test]
    fn len_over_array_and_object() {
        let state = state_with(&[], &[("items", json!([1, 2, 3]))]);
        assert!(check("len(artifacts.items) == 3", &state));
        assert!(check("len(artifacts.items) > 2", &state));
    }

    #[test]
    fn and_or_not_short_circuit_semantics() {
        let state = state_with(
            &[("review_status", json!("REFINAR")), ("attempts", json!(1))],
            &[],
        );
        assert!(check(
            "quality.review_status == 'REFINAR' and quality.attempts < 3",
            &state
        ));
        assert!(check(
            "not (quality.review_status == 'APROVADO') and quality.attempts < 3",
            &state
        ));
    }

    #[test]
    fn incompatible_ordering_is_an_error_not_a_panic() {
        let state = state_with(&[("label", json!("x"))], &[]);
        let err = evaluate(&parse("quality.label < 5").unwrap(), &state).unwrap_err();
        assert_eq!(err, ExpressionError::IncomparableTypes);
    }

    #[test]
    fn bracket_path_and_nested_access() {
        let state = state_with(&[], &[("plan", json!({"title": "Plan A"}))]);
        assert!(check("artifacts['plan']['title'] == 'Plan A'", &state));
        assert!(check("artifacts.plan.title == 'Plan A'", &state));
    }
}