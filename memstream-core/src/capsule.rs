//! Capsule field access
//!
//! Capsules are opaque JSON, but a handful of logical fields (the
//! "previous" pointer, the pulse stamp) must be read from wild payloads
//! that spell them many ways. Each logical field has one declared alias
//! table, resolved by ordered lookup at this single decoding boundary;
//! nothing else in the workspace duck-types capsule internals.

use serde_json::Value;

/// Field aliases for the "previous" pointer, in lookup order.
pub const PREV_FIELD_ALIASES: &[&str] = &[
    "previous",
    "prev",
    "parent",
    "parentUrl",
    "originUrl",
    "inReplyTo",
    "replyTo",
];

/// Wrapper fields that may nest the real capsule one level down.
pub const WRAPPER_FIELD_ALIASES: &[&str] = &["payload", "data", "capsule", "content"];

/// How many nested wrapper levels are searched beyond the root.
pub const MAX_WRAPPER_DEPTH: usize = 3;

/// Extract the normalized "previous" pointer from a capsule, if any.
///
/// Checks the alias table at the capsule root, then descends through
/// wrapper fields up to [`MAX_WRAPPER_DEPTH`] levels. The first hit wins.
/// A 2-element array value `[label, ref]` under an alias contributes its
/// second element.
pub fn extract_prev_ref(capsule: &Value) -> Option<String> {
    let mut current = capsule;
    for _ in 0..=MAX_WRAPPER_DEPTH {
        if let Some(found) = prev_ref_at(current) {
            return Some(found);
        }
        match unwrap_one_level(current) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    None
}

/// Extract the pulse stamp from a capsule, if present, searching the same
/// wrapper levels as the previous pointer.
pub fn extract_pulse(capsule: &Value) -> Option<i64> {
    let mut current = capsule;
    for _ in 0..=MAX_WRAPPER_DEPTH {
        if let Some(p) = pulse_at(current) {
            return Some(p);
        }
        match unwrap_one_level(current) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    None
}

fn prev_ref_at(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    for field in PREV_FIELD_ALIASES {
        match obj.get(*field) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(Value::Array(items)) if items.len() == 2 => {
                if let Some(s) = items[1].as_str() {
                    let trimmed = s.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn pulse_at(value: &Value) -> Option<i64> {
    let v = value.as_object()?.get("pulse")?;
    if let Some(i) = v.as_i64() {
        return Some(i);
    }
    let f = v.as_f64()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

fn unwrap_one_level(value: &Value) -> Option<&Value> {
    let obj = value.as_object()?;
    WRAPPER_FIELD_ALIASES
        .iter()
        .find_map(|field| obj.get(*field).filter(|v| v.is_object()))
}
