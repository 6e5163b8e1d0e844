//! Stable, transport-form-independent capsule identity
//!
//! The same logical capsule must resolve to one key whether it arrived
//! as a fragment root, a path token, or a bare payload reference. The
//! derivation is a fixed priority lookup; derived keys carry a namespace
//! prefix (`pulse:`, `sig:`, `fp:`) so the four sources cannot collide,
//! while explicit 64-hex ids are used raw (lowercased).

use crate::canonical::canonicalize;
use crate::codec::fingerprint;
use serde_json::Value;
use std::fmt;

/// Field names that may carry an explicit 64-hex identity.
pub const ID_FIELD_ALIASES: &[&str] = &["id", "sigilId", "payloadId"];

/// Field names that may carry a signature-like identity.
pub const SIGNATURE_FIELD_ALIASES: &[&str] = &["kaiSignature", "signature", "sig"];

/// Stable short identity for a capsule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey(String);

impl ContentKey {
    /// The key's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a precomputed key string (e.g. read back from persistence).
    pub fn from_raw(s: impl Into<String>) -> Self {
        ContentKey(s.into())
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ContentKey> for String {
    fn from(k: ContentKey) -> String {
        k.0
    }
}

/// Derive the content key for a capsule.
///
/// Priority: explicit 64-hex id field (lowercased) > positive finite
/// pulse field > signature-like field > fingerprint of the canonical
/// JSON. Key insertion order in the capsule never affects the result.
pub fn content_key(capsule: &Value) -> ContentKey {
    if let Some(obj) = capsule.as_object() {
        for field in ID_FIELD_ALIASES {
            if let Some(id) = obj.get(*field).and_then(Value::as_str) {
                if is_hex64(id) {
                    return ContentKey(id.to_ascii_lowercase());
                }
            }
        }

        if let Some(pulse) = positive_pulse(obj.get("pulse")) {
            return ContentKey(format!("pulse:{}", pulse));
        }

        for field in SIGNATURE_FIELD_ALIASES {
            if let Some(sig) = obj.get(*field).and_then(Value::as_str) {
                if !sig.trim().is_empty() {
                    return ContentKey(format!("sig:{}", fingerprint(sig.trim())));
                }
            }
        }
    }

    ContentKey(format!("fp:{}", fingerprint(&canonicalize(capsule))))
}

fn is_hex64(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn positive_pulse(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    if let Some(i) = value.as_i64() {
        return (i > 0).then_some(i);
    }
    // Accept an integral positive double, the shape loose JSON producers emit.
    let f = value.as_f64()?;
    (f.is_finite() && f > 0.0 && f.fract() == 0.0).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HEX_ID: &str = "A3F0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0a3f0";

    #[test]
    fn test_explicit_id_wins_and_lowercases() {
        let capsule = json!({"id": HEX_ID, "pulse": 42, "kaiSignature": "sig"});
        assert_eq!(content_key(&capsule).as_str(), HEX_ID.to_ascii_lowercase());
    }

    #[test]
    fn test_short_id_is_not_an_identity() {
        let capsule = json!({"id": "abc123", "pulse": 42});
        assert_eq!(content_key(&capsule).as_str(), "pulse:42");
    }

    #[test]
    fn test_pulse_key() {
        assert_eq!(content_key(&json!({"pulse": 7})).as_str(), "pulse:7");
        assert_eq!(content_key(&json!({"pulse": 7.0})).as_str(), "pulse:7");
    }

    #[test]
    fn test_non_positive_pulse_falls_through() {
        let zero = content_key(&json!({"pulse": 0}));
        assert!(zero.as_str().starts_with("fp:"));
        let negative = content_key(&json!({"pulse": -3}));
        assert!(negative.as_str().starts_with("fp:"));
    }

    #[test]
    fn test_signature_key() {
        let k = content_key(&json!({"kaiSignature": "sealed"}));
        assert_eq!(k.as_str(), format!("sig:{}", fingerprint("sealed")));
    }

    #[test]
    fn test_fingerprint_fallback() {
        let k = content_key(&json!({"caption": "hello"}));
        assert!(k.as_str().starts_with("fp:"));
    }

    #[test]
    fn test_key_ignores_insertion_order() {
        let a: Value = serde_json::from_str(r#"{"caption":"x","tags":[1,2]}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"tags":[1,2],"caption":"x"}"#).unwrap();
        assert_eq!(content_key(&a), content_key(&b));
    }

    #[test]
    fn test_non_object_capsule() {
        let k = content_key(&json!("just a string"));
        assert!(k.as_str().starts_with("fp:"));
    }
}
