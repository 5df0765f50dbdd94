//! Script return values and their bounded rendering.

use serde_json::Value;

const MAX_DEPTH: usize = 4;
const MAX_ITEMS: usize = 50;
const MAX_STRING_CHARS: usize = 2_000;

/// A value produced by a script, either through `result.*` or as the
/// results of its `main` export.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Undefined,
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Json(Value),
    /// Multiple `main` results.
    List(Vec<ScriptValue>),
    /// A reference result (funcref / externref) with no textual form.
    Opaque(&'static str),
}

/// Render a value for display. Top-level strings are shown raw; nested
/// structure is quoted and cut off past a fixed depth and width.
pub fn format_value(value: &ScriptValue) -> String {
    match value {
        ScriptValue::String(s) => clip(s),
        ScriptValue::Json(Value::String(s)) => clip(s),
        other => render(other, 0),
    }
}

fn render(value: &ScriptValue, depth: usize) -> String {
    match value {
        ScriptValue::Undefined => "undefined".into(),
        ScriptValue::I32(v) => v.to_string(),
        ScriptValue::I64(v) => v.to_string(),
        ScriptValue::F32(v) => float(f64::from(*v)),
        ScriptValue::F64(v) => float(*v),
        ScriptValue::String(s) => quote(s),
        ScriptValue::Json(v) => render_json(v, depth),
        ScriptValue::Opaque(kind) => format!("[{kind}]"),
        ScriptValue::List(items) => {
            if depth >= MAX_DEPTH {
                return "[Array]".into();
            }
            list(items.iter().map(|v| render(v, depth + 1)), items.len())
        }
    }
}

fn render_json(value: &Value, depth: usize) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            if depth >= MAX_DEPTH {
                return "[Array]".into();
            }
            list(items.iter().map(|v| render_json(v, depth + 1)), items.len())
        }
        Value::Object(map) => {
            if depth >= MAX_DEPTH {
                return "[Object]".into();
            }
            if map.is_empty() {
                return "{}".into();
            }
            let mut parts: Vec<String> = map
                .iter()
                .take(MAX_ITEMS)
                .map(|(k, v)| format!("{}: {}", key(k), render_json(v, depth + 1)))
                .collect();
            if map.len() > MAX_ITEMS {
                parts.push(format!("... {} more items", map.len() - MAX_ITEMS));
            }
            format!("{{ {} }}", parts.join(", "))
        }
    }
}

fn list(items: impl Iterator<Item = String>, len: usize) -> String {
    if len == 0 {
        return "[]".into();
    }
    let mut parts: Vec<String> = items.take(MAX_ITEMS).collect();
    if len > MAX_ITEMS {
        parts.push(format!("... {} more items", len - MAX_ITEMS));
    }
    format!("[ {} ]", parts.join(", "))
}

fn float(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        String::from(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        v.to_string()
    }
}

fn quote(s: &str) -> String {
    let clipped = clip(s);
    serde_json::to_string(&clipped).unwrap_or(clipped)
}

/// Plain identifiers stay bare, everything else is quoted.
fn key(k: &str) -> String {
    let bare = k
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if bare { k.to_string() } else { quote(k) }
}

fn clip(s: &str) -> String {
    crate::text::truncate_chars(s, MAX_STRING_CHARS)
}
