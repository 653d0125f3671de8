use crate::core::flow_graph::state::resolve_path;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\}\}")
            .expect("interpolation token pattern compiles")
    })
}

/// Substitute `{{path.to.value}}` tokens with values resolved from the
/// execution context. Unresolved paths stay verbatim so a misconfigured flow
/// degrades to showing the placeholder instead of failing delivery. This is
/// variable substitution only: no loops, no functions, no escaping.
pub fn interpolate(template: &str, context: &Value) -> String {
    token_pattern()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match resolve_path(context, &caps[1]) {
                Some(value) => render_value(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Interpolate every string leaf of a JSON value in place, leaving other
/// leaf types untouched. Used for request bodies and header maps.
pub fn interpolate_value(value: &Value, context: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, context)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| interpolate_value(v, context)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
