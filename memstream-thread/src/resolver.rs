//! Thread-root resolution
//!
//! The root of a conversation is established without any backend: an
//! explicit witness chain names it directly (its oldest entry), and
//! otherwise the "previous" pointers embedded in capsules are walked
//! iteratively until they run out. The walk is bounded and seen-set
//! guarded, so constructed cycles truncate silently instead of looping.

use crate::chain::{extract_add_chain, normalize_ancestor_ref};
use memstream_core::{content_key, decode_payload_ref, extract_prev_ref, ContentKey, PayloadRef};
use memstream_pack::{decode_fragment_url, decode_path_token, extract_path_token};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Bound on "previous" pointer hops during root resolution.
pub const MAX_WALK_STEPS: usize = 64;

/// Decode the capsule a URL points at, along with its canonical
/// reference.
///
/// Handles both URL forms: the fragment root (a payload ref) and the
/// path token (decoded and re-sealed as a payload ref).
pub fn capsule_at(url: &str) -> Option<(String, Value)> {
    if let Some(parts) = decode_fragment_url(url) {
        let capsule = decode_payload_ref(&parts.root)?;
        return Some((parts.root, capsule));
    }
    let token = extract_path_token(url)?;
    let post = decode_path_token(token).ok()?;
    let capsule = serde_json::to_value(&post).ok()?;
    let r = memstream_core::encode_payload_ref(&capsule);
    Some((r, capsule))
}

/// Resolve the thread root reference for a URL.
///
/// Prefers the oldest entry of an explicit witness chain. Otherwise
/// walks `previous` pointers from the URL's own capsule (or
/// `known_payload` when the caller already decoded it), stopping on a
/// missing pointer, a repeated content key, or [`MAX_WALK_STEPS`], and
/// returns the last resolvable reference.
pub fn resolve_thread_root(url: &str, known_payload: Option<&Value>) -> Option<String> {
    let chain = extract_add_chain(url);
    if let Some(oldest) = chain.first() {
        return Some(oldest.clone());
    }

    let (mut last, mut capsule) = match known_payload {
        Some(payload) => (
            memstream_core::encode_payload_ref(payload),
            payload.clone(),
        ),
        None => capsule_at(url)?,
    };

    let mut seen: HashSet<ContentKey> = HashSet::new();
    seen.insert(content_key(&capsule));

    for _ in 0..MAX_WALK_STEPS {
        let Some(prev_raw) = extract_prev_ref(&capsule) else {
            break;
        };
        let Some(prev_ref) = normalize_ancestor_ref(&prev_raw) else {
            break;
        };

        match resolve_local(&prev_ref) {
            Some(prev_capsule) => {
                let key = content_key(&prev_capsule);
                if !seen.insert(key) {
                    debug!("previous-pointer walk hit a cycle, truncating");
                    break;
                }
                last = prev_ref;
                capsule = prev_capsule;
            }
            None => {
                // The reference names an ancestor we cannot open locally;
                // it is still the oldest thing the thread can hang from.
                last = prev_ref;
                break;
            }
        }
    }

    Some(last)
}

/// Decode a normalized reference without any I/O: payload refs decode
/// directly, URLs through their embedded forms.
fn resolve_local(reference: &str) -> Option<Value> {
    if PayloadRef::parse(reference).is_some() {
        return decode_payload_ref(reference);
    }
    capsule_at(reference).map(|(_, capsule)| capsule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memstream_core::encode_payload_ref;
    use memstream_pack::{encode_fragment_url, FragmentParts};
    use serde_json::json;

    fn url_for(root: &str, adds: Vec<String>) -> String {
        encode_fragment_url(
            "https://m/s",
            &FragmentParts {
                version: 1,
                root: root.to_string(),
                seg: None,
                adds,
            },
        )
    }

    #[test]
    fn test_explicit_chain_wins() {
        let oldest = encode_payload_ref(&json!({"n": 1}));
        let mid = encode_payload_ref(&json!({"n": 2}));
        let root = encode_payload_ref(&json!({"n": 3, "previous": "ignored-when-chain-present"}));
        let url = url_for(&root, vec![oldest.clone(), mid]);
        assert_eq!(resolve_thread_root(&url, None), Some(oldest));
    }

    #[test]
    fn test_walks_previous_pointers() {
        let c1 = json!({"caption": "root", "pulse": 1});
        let r1 = encode_payload_ref(&c1);
        let c2 = json!({"caption": "mid", "pulse": 2, "previous": r1});
        let r2 = encode_payload_ref(&c2);
        let c3 = json!({"caption": "leaf", "pulse": 3, "previous": r2});
        let r3 = encode_payload_ref(&c3);

        let url = url_for(&r3, vec![]);
        assert_eq!(resolve_thread_root(&url, None), Some(r1));
    }

    #[test]
    fn test_no_pointer_resolves_to_self() {
        let c = json!({"caption": "lonely", "pulse": 9});
        let r = encode_payload_ref(&c);
        let url = url_for(&r, vec![]);
        assert_eq!(resolve_thread_root(&url, None), Some(r));
    }

    #[test]
    fn test_cycle_terminates() {
        // A -> B -> A, constructed by sealing B with a forward reference
        // to A's exact encoding is impossible, so fake the cycle with
        // pulse-keyed capsules whose refs differ but keys repeat.
        let a = json!({"pulse": 1, "previous": "j:placeholder00"});
        let ra = encode_payload_ref(&a);
        let b = json!({"pulse": 2, "previous": ra});
        let rb = encode_payload_ref(&b);
        // A second capsule with pulse 1 (same content key as `a`) that
        // points back at B.
        let a2 = json!({"pulse": 1, "previous": rb, "note": "same key as a"});
        let ra2 = encode_payload_ref(&a2);
        let c = json!({"pulse": 3, "previous": ra2});
        let rc = encode_payload_ref(&c);

        // Walk: c -> a2 (key pulse:1) -> b (key pulse:2) -> a (key pulse:1,
        // repeated) => truncate, last resolvable is b's reference.
        let url = url_for(&rc, vec![]);
        assert_eq!(resolve_thread_root(&url, None), Some(rb));
    }

    #[test]
    fn test_unresolvable_previous_is_returned() {
        let c = json!({"pulse": 5, "previous": "https://elsewhere.example/post/1"});
        let r = encode_payload_ref(&c);
        let url = url_for(&r, vec![]);
        assert_eq!(
            resolve_thread_root(&url, None),
            Some("https://elsewhere.example/post/1".to_string())
        );
    }

    #[test]
    fn test_known_payload_skips_url_decode() {
        let c1 = json!({"pulse": 1});
        let r1 = encode_payload_ref(&c1);
        let c2 = json!({"pulse": 2, "previous": r1});
        // The URL itself is opaque; the caller supplies the payload.
        let got = resolve_thread_root("https://m/opaque", Some(&c2));
        assert_eq!(got, Some(r1));
    }

    #[test]
    fn test_undecodable_url_is_none() {
        assert_eq!(resolve_thread_root("https://m/nothing-here", None), None);
    }
}
