//! Thread assembly
//!
//! Given the viewed URL and everything the local stores know, assemble a
//! deduplicated thread view: one best-scoring candidate per content key,
//! the root picked by [`resolve_thread_root`], replies ordered newest
//! first by pulse. Assembly also feeds what it learned back into the
//! chain graph and registry, so the next view starts warmer.

use crate::chain::extract_add_chain;
use crate::resolver::{capsule_at, resolve_thread_root};
use memstream_core::{
    content_key, decode_payload_ref, extract_prev_ref, extract_pulse, fingerprint, ContentKey,
    PayloadRef,
};
use memstream_graph::{ChainGraph, ChainLink};
use memstream_registry::{witness_depth, Registry};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Display role a thread item occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRole {
    Root,
    Reply,
}

/// One deduplicated thread entry.
#[derive(Debug, Clone)]
pub struct ThreadItem {
    /// Content key the candidates grouped under.
    pub key: ContentKey,
    /// Best-scoring reference for this capsule (URL or payload ref).
    pub reference: String,
    /// Decoded capsule, when any candidate decoded.
    pub capsule: Option<Value>,
    /// Pulse stamp, when the capsule carries one.
    pub pulse: Option<i64>,
    /// Role this item plays in the viewed thread.
    pub role: DisplayRole,
}

/// The assembled thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadView {
    /// The thread root, when it resolved to a known capsule.
    pub root: Option<ThreadItem>,
    /// Replies, ordered by descending pulse.
    pub replies: Vec<ThreadItem>,
}

struct Candidate {
    reference: String,
    capsule: Option<Value>,
}

impl Candidate {
    fn role(&self) -> DisplayRole {
        let has_prev = self
            .capsule
            .as_ref()
            .and_then(extract_prev_ref)
            .is_some();
        if witness_depth(&self.reference) > 0 || has_prev {
            DisplayRole::Reply
        } else {
            DisplayRole::Root
        }
    }

    /// Score against the role the thread expects this key to play:
    /// role match first, witness depth second, shorter reference last.
    fn score(&self, expected: DisplayRole) -> (bool, usize, std::cmp::Reverse<usize>) {
        (
            self.role() == expected,
            witness_depth(&self.reference),
            std::cmp::Reverse(self.reference.len()),
        )
    }
}

/// Decode any candidate reference to its capsule, without I/O.
fn open_candidate(reference: &str) -> Option<Value> {
    if PayloadRef::parse(reference).is_some() {
        return decode_payload_ref(reference);
    }
    capsule_at(reference).map(|(_, capsule)| capsule)
}

/// Key a candidate groups under: the capsule's content key when it
/// decodes, a fingerprint of the reference string otherwise.
fn candidate_key(reference: &str, capsule: Option<&Value>) -> ContentKey {
    match capsule {
        Some(c) => content_key(c),
        None => ContentKey::from_raw(format!("fp:{}", fingerprint(reference))),
    }
}

/// Assemble the thread for `view_url` from the candidate pool and feed
/// the stores.
///
/// The pool is the viewed URL, its witness chain, and every
/// registry-known URL. Candidates group by content key; each key keeps
/// its single best-scoring reference. The viewed item never appears in
/// its own reply list. Chain-graph upserts are flushed once, after
/// assembly.
pub fn assemble_thread(
    view_url: &str,
    graph: &ChainGraph,
    registry: &dyn Registry,
) -> ThreadView {
    // Gather the candidate pool.
    let mut pool: Vec<String> = vec![view_url.to_string()];
    pool.extend(extract_add_chain(view_url));
    pool.extend(registry.entries().into_iter().map(|e| e.url));

    // The viewed capsule and the thread root.
    let viewed = capsule_at(view_url);
    let viewed_key = viewed
        .as_ref()
        .map(|(_, capsule)| content_key(capsule));
    let root_ref = resolve_thread_root(view_url, viewed.as_ref().map(|(_, c)| c));
    let root_key = root_ref.as_deref().map(|r| {
        let capsule = open_candidate(r);
        candidate_key(r, capsule.as_ref())
    });

    // Group candidates by key, keeping the best score per key.
    let mut best: HashMap<ContentKey, Candidate> = HashMap::new();
    for reference in pool {
        let capsule = open_candidate(&reference);
        let key = candidate_key(&reference, capsule.as_ref());
        let expected = if Some(&key) == root_key.as_ref() {
            DisplayRole::Root
        } else {
            DisplayRole::Reply
        };
        let candidate = Candidate { reference, capsule };
        match best.get(&key) {
            Some(current) if current.score(expected) >= candidate.score(expected) => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    debug!(candidates = best.len(), "grouped thread candidates");

    // Feed the stores with what decoded.
    for (key, candidate) in &best {
        let Some(capsule) = &candidate.capsule else {
            continue;
        };
        let prev_key = extract_prev_ref(capsule)
            .and_then(|raw| crate::chain::normalize_ancestor_ref(&raw))
            .and_then(|r| open_candidate(&r).map(|c| content_key(&c)));
        graph.upsert(
            key.clone(),
            ChainLink {
                prev_key,
                payload_ref: Some(memstream_core::encode_payload_ref(capsule)),
                fallback_ref: candidate.reference.clone(),
            },
        );
        if candidate.reference.contains("://") {
            registry.upsert(key, &candidate.reference);
        }
    }
    graph.flush();

    // Build the view.
    let mut root = None;
    let mut replies = Vec::new();
    for (key, candidate) in best {
        let pulse = candidate.capsule.as_ref().and_then(extract_pulse);
        if Some(&key) == root_key.as_ref() {
            root = Some(ThreadItem {
                key,
                reference: candidate.reference,
                capsule: candidate.capsule,
                pulse,
                role: DisplayRole::Root,
            });
            continue;
        }
        // The viewed item is excluded from its own reply list.
        if Some(&key) == viewed_key.as_ref() {
            continue;
        }
        replies.push(ThreadItem {
            key,
            reference: candidate.reference,
            capsule: candidate.capsule,
            pulse,
            role: DisplayRole::Reply,
        });
    }

    // Newest first; undated entries trail, keyed for determinism.
    replies.sort_by(|a, b| {
        b.pulse
            .cmp(&a.pulse)
            .then_with(|| a.key.cmp(&b.key))
    });

    ThreadView { root, replies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memstream_core::encode_payload_ref;
    use memstream_pack::{encode_fragment_url, FragmentParts, SegmentBudget};
    use memstream_registry::{MemoryRegistry, RegistryRole};
    use serde_json::json;

    fn chain_of(n: usize) -> (Vec<Value>, Vec<String>) {
        let mut capsules = Vec::new();
        let mut refs: Vec<String> = Vec::new();
        for i in 0..n {
            let mut c = json!({"caption": format!("post {}", i), "pulse": (i as i64 + 1) * 10});
            if let Some(prev) = refs.last() {
                c["previous"] = json!(prev);
            }
            refs.push(encode_payload_ref(&c));
            capsules.push(c);
        }
        (capsules, refs)
    }

    fn stream_url(root: &str, adds: &[String]) -> String {
        encode_fragment_url(
            "https://m/s",
            &FragmentParts {
                version: 1,
                root: root.to_string(),
                seg: None,
                adds: adds.to_vec(),
            },
        )
    }

    #[test]
    fn test_assembles_root_and_replies() {
        let (_, refs) = chain_of(4);
        let url = stream_url(&refs[3], &refs[..3]);
        let graph = ChainGraph::new();
        let registry = MemoryRegistry::new(RegistryRole::Content);

        let view = assemble_thread(&url, &graph, &registry);

        let root = view.root.expect("root resolves");
        assert_eq!(root.role, DisplayRole::Root);
        assert_eq!(root.pulse, Some(10));

        // Replies are the middle posts, newest first; the viewed post
        // (refs[3]) is excluded from its own reply list.
        let pulses: Vec<_> = view.replies.iter().map(|r| r.pulse).collect();
        assert_eq!(pulses, vec![Some(30), Some(20)]);
    }

    #[test]
    fn test_viewed_root_has_no_self_reply() {
        let (_, refs) = chain_of(1);
        let url = stream_url(&refs[0], &[]);
        let graph = ChainGraph::new();
        let registry = MemoryRegistry::new(RegistryRole::Content);

        let view = assemble_thread(&url, &graph, &registry);
        assert!(view.root.is_some());
        assert!(view.replies.is_empty());
    }

    #[test]
    fn test_feeds_graph_and_registry() {
        let (capsules, refs) = chain_of(3);
        let url = stream_url(&refs[2], &refs[..2]);
        let graph = ChainGraph::new();
        let registry = MemoryRegistry::new(RegistryRole::Content);

        assemble_thread(&url, &graph, &registry);

        // The graph learned the chain: ancestors of the viewed post.
        let viewed_key = content_key(&capsules[2]);
        let ancestors = graph.ancestor_refs(&viewed_key, 16);
        assert_eq!(ancestors, vec![refs[0].clone(), refs[1].clone()]);

        // The registry learned the viewed URL under the viewed key.
        assert_eq!(registry.best(&viewed_key).as_deref(), Some(url.as_str()));
    }

    #[test]
    fn test_registry_candidates_join_the_pool() {
        let (capsules, refs) = chain_of(2);
        let graph = ChainGraph::new();
        let registry = MemoryRegistry::new(RegistryRole::Content);

        // Another context registered a reply we have never seen in a URL.
        let stray = json!({"caption": "stray reply", "pulse": 500, "previous": refs[0]});
        let stray_url = stream_url(&encode_payload_ref(&stray), &[refs[0].clone()]);
        registry.upsert(&content_key(&stray), &stray_url);

        let url = stream_url(&refs[1], &refs[..1]);
        let view = assemble_thread(&url, &graph, &registry);

        assert_eq!(
            view.root.as_ref().map(|r| r.key.clone()),
            Some(content_key(&capsules[0]))
        );
        let pulses: Vec<_> = view.replies.iter().map(|r| r.pulse).collect();
        assert_eq!(pulses, vec![Some(500)]);
    }

    #[test]
    fn test_deeper_url_outranks_shallow_for_same_key() {
        let (capsules, refs) = chain_of(3);
        let graph = ChainGraph::new();
        let registry = MemoryRegistry::new(RegistryRole::Content);

        // Registry holds a shallow URL for the viewed capsule.
        let shallow = stream_url(&refs[2], &[]);
        registry.upsert(&content_key(&capsules[2]), &shallow);

        // The viewed URL carries the full chain.
        let deep = stream_url(&refs[2], &refs[..2]);
        assemble_thread(&deep, &graph, &registry);

        // The deeper URL replaces the shallow one.
        assert_eq!(
            registry.best(&content_key(&capsules[2])).as_deref(),
            Some(deep.as_str())
        );
    }

    #[test]
    fn test_budget_is_honored_end_to_end() {
        // Segmented packs always hand assemble_thread an in-budget URL.
        let (_, refs) = chain_of(6);
        let budget = SegmentBudget::with_fragment_cap(2_000);
        let pack = memstream_pack::build_segmented_pack("https://m/s", &refs[5], &refs[..5], &budget);
        assert!(!pack.archives.is_empty());
        assert!(pack.primary.url.len() <= 2_000);

        let graph = ChainGraph::new();
        let registry = MemoryRegistry::new(RegistryRole::Content);
        let view = assemble_thread(&pack.primary.url, &graph, &registry);
        assert!(view.root.is_some());
    }
}
