//! Value Helpers
//!
//! Lookup, assignment and text rendering over the `serde_json::Value` state
//! tree.

use serde_json::{Map, Value};

/// Walk a dotted path through nested objects and arrays.
///
/// Object fields are looked up by key and array elements by numeric index.
/// Returns `None` as soon as an intermediate is missing or is a scalar. The
/// empty path returns the root itself.
///
/// ```rust,ignore
/// let state = json!({"a": {"b": 2}});
/// assert_eq!(get_nested_value(&state, "a.b"), Some(&json!(2)));
/// assert_eq!(get_nested_value(&json!({"a": {}}), "a.b.c"), None);
/// ```
pub fn get_nested_value<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(state);
    }
    path.split('.').try_fold(state, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Assign `value` at a dotted path, creating intermediate objects as needed.
///
/// Intermediates that exist but are not objects are replaced by empty
/// objects. Assigning at the empty path replaces the whole tree.
pub fn set_nested_value<'s, I>(state: &mut Value, segments: I, value: Value)
where
    I: IntoIterator<Item = &'s str>,
{
    let segments: Vec<&str> = segments.into_iter().collect();
    let Some((last, parents)) = segments.split_last() else {
        *state = value;
        return;
    };

    let mut current = state;
    for key in parents {
        current = ensure_object(current)
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Render a state value as template text.
///
/// Strings are inserted verbatim, integral numbers without a fractional
/// part, `null` and missing values as the empty string, arrays as their
/// rendered elements joined by `,`, and objects as `[object Object]`.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => render_float(f),
            _ => n.to_string(),
        },
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| render_value(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        // -0.0 renders as "0"
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
