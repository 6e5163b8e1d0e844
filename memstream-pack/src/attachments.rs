//! Attachment manifests
//!
//! Capsules can carry files three ways: as plain URL references, inlined
//! as base64url data (small files only), or as external references
//! carrying a sha256 digest so the bytes can be verified wherever they
//! are fetched from. The per-file inline cap decides placement; callers
//! never inline past it.

use crate::budget::SegmentBudget;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// An inlined file: the bytes travel inside the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFile {
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
    /// base64url (no padding) of the raw bytes.
    pub data: String,
    /// Optional base64url thumbnail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// A file stored elsewhere, referenced by digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFileRef {
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
    /// Hex SHA-256 of the file bytes.
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One manifest item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttachmentItem {
    /// Plain URL reference.
    Url(String),
    /// Inlined file bytes.
    Inline(InlineFile),
    /// External file reference with digest.
    External(ExternalFileRef),
}

/// The attachments block carried by a capsule or path token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentManifest {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlined_bytes: Option<u64>,
    pub items: Vec<AttachmentItem>,
}

impl AttachmentManifest {
    /// Build a manifest from items, computing the byte totals.
    pub fn new(items: Vec<AttachmentItem>) -> Self {
        let mut total: u64 = 0;
        let mut inlined: u64 = 0;
        for item in &items {
            match item {
                AttachmentItem::Inline(f) => {
                    total += f.size;
                    inlined += f.size;
                }
                AttachmentItem::External(f) => total += f.size,
                AttachmentItem::Url(_) => {}
            }
        }
        Self {
            version: 1,
            total_bytes: (total > 0).then_some(total),
            inlined_bytes: (inlined > 0).then_some(inlined),
            items,
        }
    }
}

/// Place a file in a manifest item.
///
/// Bytes at or under the per-file inline cap are inlined; anything
/// larger becomes an external reference carrying the sha256 digest (and
/// the storage URL, when one is known).
pub fn attach_file(
    name: impl Into<String>,
    mime: impl Into<String>,
    bytes: &[u8],
    url: Option<String>,
    budget: &SegmentBudget,
) -> AttachmentItem {
    let name = name.into();
    let mime = mime.into();
    if bytes.len() <= budget.inline_file_cap {
        AttachmentItem::Inline(InlineFile {
            name,
            mime,
            size: bytes.len() as u64,
            data: URL_SAFE_NO_PAD.encode(bytes),
            thumbnail: None,
        })
    } else {
        AttachmentItem::External(ExternalFileRef {
            name,
            mime,
            size: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            url,
        })
    }
}
