//! Variable values
//!
//! Variables hold YAML values: strings for anything produced by an expression,
//! arbitrary structures when a script assigns a nested value.

use serde_yaml::Value;
use std::collections::HashMap;

/// Variable store of one run
pub type Vars = HashMap<String, Value>;

/// Truthiness of a value: empty, zero, `false` and null are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// Render a value as text for command lines and messages
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(seq) => seq.iter().map(render).collect::<Vec<_>>().join(" "),
        Value::Mapping(_) | Value::Tagged(_) => flow(value),
    }
}

/// Single-line YAML flow style, e.g. `{a: 1, b: [x, y]}`
fn flow(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Sequence(seq) => {
            format!("[{}]", seq.iter().map(flow).collect::<Vec<_>>().join(", "))
        }
        Value::Mapping(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", flow(k), flow(v)))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, flow(&tagged.value)),
        other => render(other),
    }
}

/// Convenience constructor for string values
pub fn text(s: impl Into<String>) -> Value {
    Value::String(s.into())
}
