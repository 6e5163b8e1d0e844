//! Path-form post tokens
//!
//! The secondary, read-compatible URL form:
//!
//! ```text
//! /<root-route>/p/<token>
//! ```
//!
//! where the token is base64url canonical JSON of a flat post schema,
//! simpler than a full capsule and sized for copy/paste transports. Encoding
//! enforces the path budgets (over the hard cap the caller must fall
//! back to fragment form); decoding is permissive about unknown fields
//! and returns typed failures, never panics.

use crate::budget::{SegmentBudget, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::attachments::AttachmentManifest;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use memstream_core::canonicalize;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Route segment marking a path-form token.
pub const PATH_ROUTE_SEGMENT: &str = "p";

/// Where a post originally came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSource {
    X,
    Manual,
}

/// The flat schema sealed into a path token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPost {
    /// Schema version.
    pub v: u32,
    /// Canonical URL of the post content.
    pub url: String,
    /// Pulse stamp of the post.
    pub pulse: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PostSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigil_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phi_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kai_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<AttachmentManifest>,
}

impl PathPost {
    /// A minimal post for `url` at `pulse`.
    pub fn new(url: impl Into<String>, pulse: i64) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            url: url.into(),
            pulse,
            caption: None,
            author: None,
            source: None,
            sigil_id: None,
            phi_key: None,
            kai_signature: None,
            parent: None,
            parent_url: None,
            origin_url: None,
            ts: None,
            attachments: None,
        }
    }
}

/// Encode a post into its path token, enforcing the path budgets.
///
/// Exceeding the soft cap is logged and allowed; exceeding the hard cap
/// is an error, and the caller falls back to fragment form.
pub fn encode_path_token(post: &PathPost, budget: &SegmentBudget) -> Result<String> {
    let value = serde_json::to_value(post)?;
    let token = URL_SAFE_NO_PAD.encode(canonicalize(&value).as_bytes());
    if token.len() > budget.path_hard_cap {
        return Err(Error::budget(format!(
            "path token is {} chars, over the {} hard cap",
            token.len(),
            budget.path_hard_cap
        )));
    }
    if token.len() > budget.path_soft_cap {
        debug!(
            len = token.len(),
            soft_cap = budget.path_soft_cap,
            "path token exceeds the soft budget"
        );
    }
    Ok(token)
}

/// Encode a post into a full path-form URL under `base`.
pub fn path_url(base: &str, post: &PathPost, budget: &SegmentBudget) -> Result<String> {
    let token = encode_path_token(post, budget)?;
    Ok(format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        PATH_ROUTE_SEGMENT,
        token
    ))
}

/// Decode a path token back into a post.
pub fn decode_path_token(token: &str) -> Result<PathPost> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| Error::decode(format!("path token is not base64url: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| Error::decode("path token is not UTF-8"))?;
    serde_json::from_str(&text)
        .map_err(|e| Error::decode(format!("path token schema mismatch: {}", e)))
}

/// Extract the token from a path-form URL, if it is one.
pub fn extract_path_token(url: &str) -> Option<&str> {
    let path = url.split(['#', '?']).next().unwrap_or(url);
    let marker = format!("/{}/", PATH_ROUTE_SEGMENT);
    let start = path.rfind(&marker)? + marker.len();
    let token = &path[start..];
    let token = token.trim_end_matches('/');
    (!token.is_empty()).then_some(token)
}
