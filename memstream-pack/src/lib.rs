//! # memstream pack
//!
//! Packs a root payload reference and its witness chain into
//! length-budgeted, self-contained URLs:
//!
//! - `fragment`: the preferred fragment-form codec
//!   (`#v=…&root=…&seg=…&add=…`)
//! - `builder`: segment construction, budget fitting with stable
//!   Fibonacci truncation boundaries, and primary/archive segmentation
//! - `path_token`: the secondary `/p/<token>` form for short posts
//! - `attachments`: the file manifest schema and inline/external
//!   placement
//! - `budget`: the hard transport limits everything above honors
//!
//! The builder never emits an over-budget URL: oversized chains split
//! into archives, and pathological inputs degrade to a root-only
//! segment.

pub mod attachments;
pub mod budget;
pub mod builder;
pub mod error;
pub mod fragment;
pub mod path_token;

pub use attachments::{
    attach_file, sha256_hex, AttachmentItem, AttachmentManifest, ExternalFileRef, InlineFile,
};
pub use budget::{SegmentBudget, MAX_ARCHIVE_DEPTH, PROTOCOL_VERSION};
pub use builder::{
    build_segment, build_segmented_pack, decode_segment_meta, fit_to_budget, BuiltSegment,
    SegmentMeta, SegmentedPack,
};
pub use error::{Error, Result};
pub use fragment::{decode_fragment_url, encode_fragment_url, FragmentParts};
pub use path_token::{
    decode_path_token, encode_path_token, extract_path_token, path_url, PathPost, PostSource,
    PATH_ROUTE_SEGMENT,
};
