//! Fragment-form memory-stream URLs
//!
//! The preferred self-contained form:
//!
//! ```text
//! <base>#v=1&root=<payload-ref>&seg=<meta-ref>&add=<ref>&add=<ref>...
//! ```
//!
//! `add` entries are the witness chain, oldest to newest. Readers accept
//! the same keys from the query string when no fragment is present.
//! Decoding never throws: a malformed URL yields `None`.

use crate::budget::PROTOCOL_VERSION;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside fragment values. Everything else passes
/// through, keeping payload-ref tokens readable.
const VALUE_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'=')
    .add(b'?');

/// Decoded keys of a memory-stream URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentParts {
    /// Protocol version (`v`).
    pub version: u32,
    /// Root payload reference (`root`).
    pub root: String,
    /// Segment-metadata reference (`seg`), when present.
    pub seg: Option<String>,
    /// Witness chain (`add`), oldest to newest.
    pub adds: Vec<String>,
}

impl FragmentParts {
    /// Parts for a root with no chain and no metadata.
    pub fn root_only(root: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            root: root.into(),
            seg: None,
            adds: Vec::new(),
        }
    }
}

/// Serialize parts onto `base` as a fragment-form URL.
pub fn encode_fragment_url(base: &str, parts: &FragmentParts) -> String {
    let mut url = String::with_capacity(base.len() + 64);
    url.push_str(base);
    url.push('#');
    url.push_str(&format!("v={}", parts.version));
    url.push_str("&root=");
    url.push_str(&escape(&parts.root));
    if let Some(seg) = &parts.seg {
        url.push_str("&seg=");
        url.push_str(&escape(seg));
    }
    for add in &parts.adds {
        url.push_str("&add=");
        url.push_str(&escape(add));
    }
    url
}

/// Decode a memory-stream URL's keys from its fragment (preferred) or
/// query. Returns `None` when neither carries a `root`.
pub fn decode_fragment_url(url: &str) -> Option<FragmentParts> {
    if let Some((_, fragment)) = url.split_once('#') {
        if let Some(parts) = decode_params(fragment) {
            return Some(parts);
        }
    }
    let (_, after_query) = url.split_once('?')?;
    let query = after_query.split('#').next().unwrap_or("");
    decode_params(query)
}

fn decode_params(params: &str) -> Option<FragmentParts> {
    let mut version = PROTOCOL_VERSION;
    let mut root = None;
    let mut seg = None;
    let mut adds = Vec::new();

    for pair in params.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = unescape(value)?;
        match key {
            "v" => version = value.parse().ok()?,
            "root" if root.is_none() => root = Some(value),
            "seg" if seg.is_none() => seg = Some(value),
            "add" => adds.push(value),
            _ => {}
        }
    }

    Some(FragmentParts {
        version,
        root: root?,
        seg,
        adds,
    })
}

fn escape(value: &str) -> String {
    utf8_percent_encode(value, VALUE_ESCAPES).to_string()
}

fn unescape(value: &str) -> Option<String> {
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}
