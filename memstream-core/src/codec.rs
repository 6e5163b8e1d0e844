//! Content-addressed payload references and fingerprints
//!
//! A payload reference is `"j:"` + base64url (no padding) of the UTF-8
//! canonical JSON of a capsule. Because the canonical form is a pure
//! function of logical content, the same capsule always yields the same
//! reference, and the reference decodes back to a deep-equal capsule.
//!
//! Decoding is total: malformed tokens return `None`, never a panic.

use crate::canonical::canonicalize;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;
use std::fmt;

/// Literal prefix marking a content-embedded payload reference.
pub const PAYLOAD_REF_PREFIX: &str = "j:";

/// Minimum base64url token length (after the prefix) accepted by decode.
pub const MIN_TOKEN_LEN: usize = 8;

/// A content-embedded reference to a capsule.
///
/// The string form is the canonical identity: equal capsules produce
/// byte-equal references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadRef(String);

impl PayloadRef {
    /// Encode a capsule into its payload reference.
    pub fn encode(capsule: &Value) -> Self {
        let canonical = canonicalize(capsule);
        PayloadRef(format!(
            "{}{}",
            PAYLOAD_REF_PREFIX,
            URL_SAFE_NO_PAD.encode(canonical.as_bytes())
        ))
    }

    /// Validate and wrap an existing reference string.
    ///
    /// Accepts only `j:`-prefixed tokens of at least [`MIN_TOKEN_LEN`]
    /// base64url characters.
    pub fn parse(s: &str) -> Option<Self> {
        let token = s.strip_prefix(PAYLOAD_REF_PREFIX)?;
        if !is_base64url_token(token) {
            return None;
        }
        Some(PayloadRef(s.to_string()))
    }

    /// Decode the referenced capsule.
    pub fn decode(&self) -> Option<Value> {
        decode_payload_ref(&self.0)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PayloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PayloadRef> for String {
    fn from(r: PayloadRef) -> String {
        r.0
    }
}

/// Encode a capsule into its payload reference string.
pub fn encode_payload_ref(capsule: &Value) -> String {
    PayloadRef::encode(capsule).into()
}

/// Decode a payload reference string back into a capsule.
///
/// Returns `None` for missing prefix, short tokens, bytes outside the
/// base64url alphabet, or invalid UTF-8/JSON.
pub fn decode_payload_ref(s: &str) -> Option<Value> {
    let token = s.strip_prefix(PAYLOAD_REF_PREFIX)?;
    if !is_base64url_token(token) {
        tracing::debug!(len = token.len(), "rejected payload ref token");
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    serde_json::from_str(&text).ok()
}

fn is_base64url_token(token: &str) -> bool {
    token.len() >= MIN_TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x100_0000_01b3;

/// 64-bit FNV-1a over the string's UTF-16 code units, as 16 lower-hex
/// characters.
///
/// This is the wire-visible hash primitive: Merkle levels, derived
/// content keys, and segment ids are all built from it.
pub fn fingerprint(s: &str) -> String {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in s.encode_utf16() {
        hash ^= unit as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_round_trip() {
        let capsule = json!({
            "kind": "post",
            "caption": "first light",
            "pulse": 1234,
            "nested": {"b": [1, 2, 3], "a": null}
        });
        let r = encode_payload_ref(&capsule);
        assert!(r.starts_with(PAYLOAD_REF_PREFIX));
        let decoded = decode_payload_ref(&r).unwrap();
        assert_eq!(decoded, capsule);
    }

    #[test]
    fn test_same_capsule_same_ref() {
        let a: Value = serde_json::from_str(r#"{"x":1,"y":"z"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y":"z","x":1}"#).unwrap();
        assert_eq!(encode_payload_ref(&a), encode_payload_ref(&b));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_payload_ref("not-a-ref"), None);
        assert_eq!(decode_payload_ref("j:"), None);
        // Too short.
        assert_eq!(decode_payload_ref("j:abc"), None);
        // Outside the base64url alphabet.
        assert_eq!(decode_payload_ref("j:aaaa+bbbb/cc=="), None);
        // Valid alphabet but not JSON.
        assert_eq!(decode_payload_ref("j:________"), None);
    }

    #[test]
    fn test_parse_validates() {
        let r = PayloadRef::encode(&json!({"a": 1}));
        assert_eq!(PayloadRef::parse(r.as_str()), Some(r.clone()));
        assert_eq!(PayloadRef::parse("j:ab"), None);
        assert_eq!(PayloadRef::parse("x:abcdefgh"), None);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        // FNV-1a of the empty string is the offset basis.
        assert_eq!(fingerprint(""), "cbf29ce484222325");
        assert_eq!(fingerprint("a"), fingerprint("a"));
        assert_ne!(fingerprint("a"), fingerprint("b"));
        assert_eq!(fingerprint("hello").len(), 16);
    }

    #[test]
    fn test_fingerprint_handles_non_bmp() {
        // Non-BMP characters hash as two surrogate code units.
        assert_eq!(fingerprint("𝄞"), fingerprint("\u{1d11e}"));
        assert_ne!(fingerprint("𝄞"), fingerprint("G"));
        assert_eq!(fingerprint("𝄞").len(), 16);
    }
}
