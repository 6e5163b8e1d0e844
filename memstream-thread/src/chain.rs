//! Witness-chain extraction and reference normalization
//!
//! `add` entries arrive in three forms: content-embedded payload refs,
//! full memory-stream URLs, and bare base64url tokens. All three
//! normalize to one canonical form (the payload-ref token whenever the
//! content is recoverable, the trimmed URL otherwise) so downstream
//! grouping and deduplication see one spelling per capsule.

use memstream_core::{encode_payload_ref, PayloadRef};
use memstream_pack::{decode_fragment_url, decode_path_token, extract_path_token};
use tracing::debug;

/// Maximum witness-chain entries kept from a URL (most recent win).
pub const MAX_CHAIN_DEPTH: usize = 64;

/// Normalize one ancestor reference to its canonical form.
///
/// Accepted forms, in probe order:
/// 1. content-embedded payload ref (`j:` token): kept as is;
/// 2. memory-stream URL: reduced to its root ref (a path-form URL is
///    reduced to the payload ref of its decoded post); an undecodable
///    URL is kept whole as a fallback reference;
/// 3. bare base64url token: prefixed into a payload ref.
///
/// Anything else is dropped.
pub fn normalize_ancestor_ref(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(r) = PayloadRef::parse(trimmed) {
        return Some(r.into());
    }

    if trimmed.contains("://") {
        if let Some(parts) = decode_fragment_url(trimmed) {
            if let Some(r) = PayloadRef::parse(&parts.root) {
                return Some(r.into());
            }
            return Some(parts.root);
        }
        if let Some(token) = extract_path_token(trimmed) {
            if let Ok(post) = decode_path_token(token) {
                if let Ok(value) = serde_json::to_value(&post) {
                    return Some(encode_payload_ref(&value));
                }
            }
        }
        // A URL we cannot reduce still names the ancestor.
        return Some(trimmed.to_string());
    }

    if let Some(r) = PayloadRef::parse(&format!("j:{}", trimmed)) {
        return Some(r.into());
    }

    debug!(len = trimmed.len(), "dropped unrecognized ancestor ref");
    None
}

/// Extract the normalized witness chain from a URL, oldest to newest.
///
/// Reads repeated `add` entries from the fragment (preferred) or query,
/// percent-decoded, normalizes each accepted form, and truncates to
/// [`MAX_CHAIN_DEPTH`] keeping the most recent entries.
pub fn extract_add_chain(url: &str) -> Vec<String> {
    let mut chain: Vec<String> = decode_fragment_url(url)
        .map(|parts| parts.adds)
        .unwrap_or_default()
        .iter()
        .filter_map(|raw| normalize_ancestor_ref(raw))
        .collect();

    if chain.len() > MAX_CHAIN_DEPTH {
        let dropped = chain.len() - MAX_CHAIN_DEPTH;
        debug!(dropped, "truncated witness chain to max depth");
        chain.drain(..dropped);
    }
    chain
}
