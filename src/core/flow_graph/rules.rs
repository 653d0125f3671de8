use crate::core::flow_graph::state::resolve_path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ordered branching rule on a condition node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub field: String,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: Value,
}

/// Closed operator set for condition rules. This is deliberately not an
/// expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
    NotExists,
}

/// First rule whose predicate holds against the context, in declaration order.
pub fn first_matching<'a>(rules: &'a [Rule], context: &Value) -> Option<&'a Rule> {
    rules.iter().find(|rule| evaluate(rule, context))
}

/// Evaluate a single rule against the context. The `field` is a dotted path;
/// an unresolvable path only satisfies `notExists`.
pub fn evaluate(rule: &Rule, context: &Value) -> bool {
    let actual = resolve_path(context, &rule.field);
    match rule.operator {
        RuleOperator::Exists => actual.is_some(),
        RuleOperator::NotExists => actual.is_none(),
        RuleOperator::Equals => actual.map(|a| loose_eq(a, &rule.value)).unwrap_or(false),
        RuleOperator::NotEquals => actual.map(|a| !loose_eq(a, &rule.value)).unwrap_or(false),
        RuleOperator::Contains => actual.map(|a| contains(a, &rule.value)).unwrap_or(false),
        RuleOperator::GreaterThan => compare(actual, &rule.value)
            .map(|ordering| ordering == std::cmp::Ordering::Greater)
            .unwrap_or(false),
        RuleOperator::LessThan => compare(actual, &rule.value)
            .map(|ordering| ordering == std::cmp::Ordering::Less)
            .unwrap_or(false),
    }
}

/// Equality with numeric and string coercion, so `"20"` in context matches a
/// configured `20` and vice versa.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    match (a.as_str(), b.as_str()) {
        (Some(x), _) => Some(x.to_string()) == stringify(b),
        (_, Some(y)) => stringify(a) == Some(y.to_string()),
        _ => false,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => stringify(needle)
            .map(|needle| s.contains(&needle))
            .unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        _ => false,
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let a = as_number(actual?)?;
    let b = as_number(expected)?;
    a.partial_cmp(&b)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
