//! Canonical JSON serialization
//!
//! Produces one deterministic byte string per logical JSON value:
//! object keys sorted by UTF-16 code units, array order preserved,
//! minimal number forms. Payload references and content fingerprints are
//! derived from this form, so two capsules that differ only in key
//! insertion order encode and address identically.
//!
//! ## Number handling
//!
//! - Integers within the 2^53-1 safe range serialize as plain decimals.
//! - Integers outside the safe range serialize as quoted decimal strings,
//!   so the canonical form survives consumers that parse numbers as
//!   doubles.
//! - Non-finite doubles map to `null`.

use serde_json::Value;

/// Largest integer magnitude that survives a round trip through an IEEE
/// double (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Serialize a JSON value to its canonical string form.
///
/// The output is a pure function of logical content: key order in the
/// input is irrelevant, whitespace is never emitted.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort keys by UTF-16 code units so ordering matches lexical
            // comparison of the serialized escaped strings.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| {
                let mut au = a.encode_utf16();
                let mut bu = b.encode_utf16();
                loop {
                    match (au.next(), bu.next()) {
                        (None, None) => return std::cmp::Ordering::Equal,
                        (None, Some(_)) => return std::cmp::Ordering::Less,
                        (Some(_), None) => return std::cmp::Ordering::Greater,
                        (Some(x), Some(y)) if x != y => return x.cmp(&y),
                        _ => {}
                    }
                }
            });
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if let Some(u) = n.as_u64() {
        if u <= MAX_SAFE_INTEGER {
            out.push_str(&u.to_string());
        } else {
            write_string(&u.to_string(), out);
        }
        return;
    }
    if let Some(i) = n.as_i64() {
        if i >= -(MAX_SAFE_INTEGER as i64) {
            out.push_str(&i.to_string());
        } else {
            write_string(&i.to_string(), out);
        }
        return;
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => {
            if f == 0.0 {
                out.push('0');
            } else if f.fract() == 0.0 && f.abs() < 1e15 {
                out.push_str(&(f as i64).to_string());
            } else {
                // Rust's Display for f64 is the shortest round-trip form.
                out.push_str(&f.to_string());
            }
        }
        // NaN / infinity cannot carry content: map to null.
        _ => out.push_str("null"),
    }
}

fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if c < '\u{0020}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
