//! Helpers over dynamically typed request contexts.
//!
//! A context is a `serde_json::Value` object; expression conditions and the
//! preprocessor read it through dot-separated field paths.

use serde_json::Value;

/// Resolve a dot-separated field path against a context value.
///
/// Missing intermediate keys resolve to `None`; traversal into a non-object
/// also resolves to `None`.
pub fn resolve_path<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = ctx;
    for key in path.split('.') {
        cur = cur.as_object()?.get(key)?;
    }
    Some(cur)
}

/// Boolean coercion shared by the expression language and detectors.
///
/// Booleans pass through; null is false; numbers are non-zero; strings,
/// arrays and objects are non-empty.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(m) => !m.is_empty(),
    }
}
