// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bracketed placeholder prompt rendering: `{context[key]}`,
//! `{artifacts[key]}`, `{quality[key]}`, with nested
//! access via repeated brackets (`{artifacts[plan][title]}`) and
//! missing-key substitution as the empty string rather than an error.
//!
//! The teacher renders prompts through `infrastructure::prompt_template_engine`
//! (a Handlebars wrapper), but Handlebars' `{{ }}` delimiter syntax cannot
//! express this DSL's single-brace `{root[key]}` placeholders, so this is a
//! small hand-rolled scanner instead of a Handlebars helper.

use crate::state::GlobalState;

/// Replace every `{root[key]...}` placeholder in `template` with the
/// corresponding value from `state`, stringified, or the empty string if
/// the path does not resolve. Text outside placeholders passes through
/// unchanged; an unrecognized or malformed `{...}` span is also passed
/// through unchanged so stray literal braces in a prompt do not error.
pub fn render(template: &str, state: &GlobalState) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some((value, consumed)) = try_render_placeholder(&template[i..], state) {
                out.push_str(&value);
                i += consumed;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

/// Attempt to parse and resolve a placeholder starting at `src[0] == '{'`.
/// Returns the rendered text and the number of bytes consumed from `src` on
/// success.
fn try_render_placeholder(src: &str, state: &GlobalState) -> Option<(String, usize)> {
    let rest = &src[1..];
    let close = rest.find('}')?;
    let body = &rest[..close];
    let consumed = close + 2;

    let bracket = body.find('[')?;
    let root = &body[..bracket];
    if !matches!(root, "context" | "artifacts" | "quality") {
        return None;
    }

    let mut keys = Vec::new();
    let mut remainder = &body[bracket..];
    while let Some(tail) = remainder.strip_prefix('[') {
        let end = tail.find(']')?;
        keys.push(tail[..end].trim_matches(['\'', '"']).to_string());
        remainder = &tail[end + 1..];
    }
    if !remainder.is_empty() || keys.is_empty() {
        return None;
    }

    let rendered = match state.resolve_path(root, &keys) {
        Some(value) => value_to_text(&value),
        None => String::new(),
    };

    Some((rendered, consumed))
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn state() -> GlobalState {
        let mut state = GlobalState::initial(Map::new());
        state.context.insert("topic".into(), json!("widgets"));
        state
            .artifacts
            .insert("plan".into(), json!({"title": "Plan A"}));
        state
    }

    #[test]
    fn substitutes_simple_and_nested_placeholders() {
        let s = state();
        assert_eq!(render("Topic: {context[topic]}", &s), "Topic: widgets");
        assert_eq!(
            render("Plan: {artifacts[plan][title]}", &s),
            "Plan: Plan A"
        );
    }

    #[test]
    fn missing_key_renders_as_empty_string() {
        let s = state();
        assert_eq!(render("X: {context[missing]}", &s), "X: ");
    }

    #[test]
    fn unrecognized_braces_pass_through_unchanged() {
        let s = state();
        assert_eq!(render("{not_a_root[x]}", &s), "{not_a_root[x]}");
        assert_eq!(render("literal { braces }", &s), "literal { braces }");
    }
}