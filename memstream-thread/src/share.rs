//! Authoring-side share flow
//!
//! Turning a freshly authored capsule into a memory-stream URL: seal the
//! capsule into its payload reference, record its link in the chain
//! graph, rebuild its ancestor list from the graph, and pack everything
//! into in-budget segments.

use crate::chain::{normalize_ancestor_ref, MAX_CHAIN_DEPTH};
use memstream_core::{content_key, decode_payload_ref, encode_payload_ref, extract_prev_ref};
use memstream_graph::{ChainGraph, ChainLink};
use memstream_pack::{build_segmented_pack, SegmentBudget, SegmentedPack};
use serde_json::Value;

/// Pack a capsule into shareable segments, consulting `graph` for its
/// known ancestors.
///
/// The capsule's own link is upserted first (deriving `prev` from its
/// previous pointer), so repeated shares of a growing thread keep
/// extending the same chain. One batched graph notification is flushed
/// before returning.
pub fn share_capsule(
    base: &str,
    capsule: &Value,
    graph: &ChainGraph,
    budget: &SegmentBudget,
) -> SegmentedPack {
    let root_ref = encode_payload_ref(capsule);
    let key = content_key(capsule);

    let prev_key = extract_prev_ref(capsule)
        .and_then(|raw| normalize_ancestor_ref(&raw))
        .and_then(|r| decode_payload_ref(&r).map(|c| content_key(&c)));
    graph.upsert(
        key.clone(),
        ChainLink {
            prev_key,
            payload_ref: Some(root_ref.clone()),
            fallback_ref: root_ref.clone(),
        },
    );
    graph.flush();

    let adds = graph.ancestor_refs(&key, MAX_CHAIN_DEPTH);
    build_segmented_pack(base, &root_ref, &adds, budget)
}
