//! Segment building and budget fitting
//!
//! A segment packs a root payload reference plus an ordered ancestor
//! list (oldest to newest) into one fragment-form URL, together with a
//! metadata reference witnessing the exact sequence. When the full
//! segment exceeds the hard cap, the oldest ancestors are dropped into
//! archive segments: the kept suffix becomes the primary, and the
//! dropped prefix is re-packed with the oldest kept entry promoted to
//! the archive's root (boundary rotation). The primary URL is always in
//! budget, degrading to a root-only segment in the worst case.
//!
//! ## Truncation boundaries
//!
//! The kept-count found by binary search is snapped DOWN to the nearest
//! Fibonacci number. Repeated shares of a growing thread then truncate
//! at the same boundaries, so equal suffixes reproduce equal segment
//! URLs instead of drifting by one entry per share.

use crate::budget::{SegmentBudget, MAX_ARCHIVE_DEPTH, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::fragment::{encode_fragment_url, FragmentParts};
use memstream_core::{canonicalize, decode_payload_ref, encode_payload_ref, fingerprint, merkle_root};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Metadata sealed into the `seg` reference of every segment URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMeta {
    /// Protocol version.
    pub version: u32,
    /// Fingerprint of the sealed root + ancestor sequence.
    pub id: String,
    /// Merkle root over `[root, adds...]`.
    pub merkle_root: String,
    /// Number of Merkle leaves (ancestors plus the root).
    pub leaf_count: usize,
    /// Number of ancestor entries.
    pub add_count: usize,
    /// Fingerprint of the root reference alone.
    pub short_root: String,
}

/// One packed, in-budget segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltSegment {
    /// The serialized fragment-form URL.
    pub url: String,
    /// Root payload reference.
    pub root_ref: String,
    /// Ancestor references, oldest to newest.
    pub adds: Vec<String>,
    /// Merkle root over `[root, adds...]`.
    pub merkle_root: String,
    /// `adds.len() + 1`.
    pub leaf_count: usize,
    /// `adds.len()`.
    pub add_count: usize,
}

/// A primary segment plus the archive segments holding its overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedPack {
    /// The in-budget segment for the newest suffix of the chain.
    pub primary: BuiltSegment,
    /// Older overflow, nearest-first: `archives[0]` holds the entries
    /// just older than the primary's, deeper entries follow.
    pub archives: Vec<BuiltSegment>,
}

impl SegmentedPack {
    /// Reconstruct the original ancestor sequence, oldest to newest.
    ///
    /// Walks the archives deepest-first (the deepest archive holds the
    /// oldest prefix), then appends the primary's entries. Every original
    /// ancestor appears exactly once; rotated archive roots are not
    /// repeated because they live in a later segment's `adds`.
    pub fn flatten(&self) -> Vec<String> {
        self.archives
            .iter()
            .rev()
            .flat_map(|segment| segment.adds.iter().cloned())
            .chain(self.primary.adds.iter().cloned())
            .collect()
    }
}

/// Build one segment URL for a root and its full ancestor list.
pub fn build_segment<S: AsRef<str>>(base: &str, root_ref: &str, adds: &[S]) -> BuiltSegment {
    let adds: Vec<String> = adds.iter().map(|a| a.as_ref().to_string()).collect();

    let mut leaves: Vec<&str> = Vec::with_capacity(adds.len() + 1);
    leaves.push(root_ref);
    leaves.extend(adds.iter().map(String::as_str));
    let merkle = merkle_root(&leaves);
    let leaves_value = serde_json::Value::Array(
        leaves.iter().map(|s| serde_json::Value::from(*s)).collect(),
    );

    let meta = SegmentMeta {
        version: PROTOCOL_VERSION,
        id: fingerprint(&canonicalize(&leaves_value)),
        merkle_root: merkle.clone(),
        leaf_count: leaves.len(),
        add_count: adds.len(),
        short_root: fingerprint(root_ref),
    };
    let seg_ref = encode_payload_ref(&serde_json::to_value(&meta).expect("meta serializes"));

    let url = encode_fragment_url(
        base,
        &FragmentParts {
            version: PROTOCOL_VERSION,
            root: root_ref.to_string(),
            seg: Some(seg_ref),
            adds: adds.clone(),
        },
    );

    BuiltSegment {
        url,
        root_ref: root_ref.to_string(),
        adds,
        merkle_root: merkle,
        leaf_count: meta.leaf_count,
        add_count: meta.add_count,
    }
}

/// Decode the metadata sealed in a `seg` reference.
pub fn decode_segment_meta(seg_ref: &str) -> Result<SegmentMeta> {
    let value = decode_payload_ref(seg_ref)
        .ok_or_else(|| Error::decode("segment metadata reference does not decode"))?;
    Ok(serde_json::from_value(value)?)
}

/// Find how many of the newest ancestors fit under `cap`.
///
/// Binary-searches the largest suffix whose segment URL serializes at or
/// under `cap`, then snaps the count down to the nearest Fibonacci
/// number (never upward, so the cap still holds). A count that already
/// covers every ancestor is returned unsnapped.
pub fn fit_to_budget<S: AsRef<str>>(base: &str, root_ref: &str, adds: &[S], cap: usize) -> usize {
    let fits = |keep: usize| {
        let suffix = &adds[adds.len() - keep..];
        build_segment(base, root_ref, suffix).url.len() <= cap
    };

    let mut lo = 0;
    let mut hi = adds.len();
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    if lo == adds.len() {
        return lo;
    }
    let snapped = fibonacci_floor(lo);
    if snapped < lo {
        debug!(fit = lo, snapped, "snapped kept ancestors to fibonacci boundary");
    }
    snapped
}

/// Largest Fibonacci number at or under `n` (0 for 0).
fn fibonacci_floor(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let (mut a, mut b) = (1usize, 2usize);
    while b <= n {
        (a, b) = (b, a + b);
    }
    a
}

/// Pack a root and its ancestor chain into in-budget segments.
///
/// If everything fits under the fragment cap, the pack is the single
/// primary segment. Otherwise the fitted suffix becomes the primary and
/// the dropped prefix recurses into archive segments, each rooted at the
/// oldest entry kept by the level above. Recursion is bounded by
/// [`MAX_ARCHIVE_DEPTH`]; pathological inputs degrade to a root-only
/// segment rather than exceeding the cap.
pub fn build_segmented_pack<S: AsRef<str>>(
    base: &str,
    root_ref: &str,
    adds: &[S],
    budget: &SegmentBudget,
) -> SegmentedPack {
    let cap = budget.fragment_hard_cap;
    let mut segments: Vec<BuiltSegment> = Vec::new();
    let mut root = root_ref.to_string();
    let mut pending: Vec<String> = adds.iter().map(|a| a.as_ref().to_string()).collect();
    let mut depth = 0;

    loop {
        let candidate = build_segment(base, &root, &pending);
        if candidate.url.len() <= cap {
            segments.push(candidate);
            break;
        }
        if depth >= MAX_ARCHIVE_DEPTH {
            warn!(
                depth,
                dropped = pending.len(),
                "archive depth guard hit, degrading to root-only segment"
            );
            segments.push(build_segment::<&str>(base, &root, &[]));
            break;
        }

        let keep = fit_to_budget(base, &root, &pending, cap);
        if keep == 0 {
            warn!(
                dropped = pending.len(),
                "no ancestor fits under the cap, degrading to root-only segment"
            );
            segments.push(build_segment::<&str>(base, &root, &[]));
            break;
        }

        let split_at = pending.len() - keep;
        let kept = pending.split_off(split_at);
        segments.push(build_segment(base, &root, &kept));

        // Boundary rotation: the oldest kept entry roots the next level.
        root = kept[0].clone();
        if pending.is_empty() {
            break;
        }
        depth += 1;
    }

    let mut iter = segments.into_iter();
    let primary = iter.next().expect("at least one segment is always built");
    SegmentedPack {
        primary,
        archives: iter.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://m/s";

    fn refs(n: usize, width: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("j:{}{:06}", "a".repeat(width.saturating_sub(8)), i))
            .collect()
    }

    #[test]
    fn test_full_fit_is_single_segment() {
        let adds = refs(4, 24);
        let pack = build_segmented_pack(BASE, "j:cm9vdHJvb3Q", &adds, &SegmentBudget::default());
        assert!(pack.archives.is_empty());
        assert_eq!(pack.primary.adds, adds);
        assert_eq!(pack.primary.add_count, 4);
        assert_eq!(pack.primary.leaf_count, 5);
        assert!(pack.primary.url.len() <= SegmentBudget::default().fragment_hard_cap);
    }

    #[test]
    fn test_segment_meta_round_trips() {
        let adds = refs(3, 24);
        let segment = build_segment(BASE, "j:cm9vdHJvb3Q", &adds);
        let parts = crate::fragment::decode_fragment_url(&segment.url).unwrap();
        let meta = decode_segment_meta(parts.seg.as_deref().unwrap()).unwrap();
        assert_eq!(meta.add_count, 3);
        assert_eq!(meta.leaf_count, 4);
        assert_eq!(meta.merkle_root, segment.merkle_root);
        assert_eq!(meta.short_root, memstream_core::fingerprint("j:cm9vdHJvb3Q"));
    }

    #[test]
    fn test_merkle_witnesses_order() {
        let a = build_segment(BASE, "j:cm9vdHJvb3Q", &["x1", "x2"]);
        let b = build_segment(BASE, "j:cm9vdHJvb3Q", &["x2", "x1"]);
        assert_ne!(a.merkle_root, b.merkle_root);
    }

    #[test]
    fn test_fifty_ancestors_against_tight_cap() {
        // The documented scenario: 50 ancestors of 500 chars each against
        // a 3,500-char cap.
        let adds = refs(50, 500);
        let budget = SegmentBudget::with_fragment_cap(3_500);
        let pack = build_segmented_pack(BASE, "j:cm9vdHJvb3Q", &adds, &budget);

        assert!(pack.primary.url.len() <= 3_500);
        assert!(!pack.archives.is_empty());
        for archive in &pack.archives {
            assert!(archive.url.len() <= 3_500);
        }
        // Flattening restores every original ancestor exactly once.
        assert_eq!(pack.flatten(), adds);
    }

    #[test]
    fn test_boundary_rotation_roots_archives() {
        let adds = refs(50, 500);
        let budget = SegmentBudget::with_fragment_cap(3_500);
        let pack = build_segmented_pack(BASE, "j:cm9vdHJvb3Q", &adds, &budget);

        // The primary keeps the true thread root; each archive is rooted
        // at the oldest entry kept by the level above it.
        assert_eq!(pack.primary.root_ref, "j:cm9vdHJvb3Q");
        assert_eq!(pack.archives[0].root_ref, pack.primary.adds[0]);
        for pair in pack.archives.windows(2) {
            assert_eq!(pair[1].root_ref, pair[0].adds[0]);
        }
    }

    #[test]
    fn test_huge_single_ancestor_degrades_to_zero_adds() {
        let huge = vec![format!("j:{}", "x".repeat(10_000))];
        let budget = SegmentBudget::with_fragment_cap(1_000);
        let pack = build_segmented_pack(BASE, "j:cm9vdHJvb3Q", &huge, &budget);
        assert!(pack.primary.adds.is_empty());
        assert!(pack.archives.is_empty());
        assert!(pack.primary.url.len() <= 1_000);
    }

    #[test]
    fn test_fit_snaps_to_fibonacci() {
        let adds = refs(30, 60);
        // Pick a cap that admits some but not all entries.
        let probe = build_segment(BASE, "j:cm9vdHJvb3Q", &adds[adds.len() - 7..]);
        let cap = probe.url.len();
        let kept = fit_to_budget(BASE, "j:cm9vdHJvb3Q", &adds, cap);
        assert!(kept <= 7);
        assert!(
            matches!(kept, 0 | 1 | 2 | 3 | 5 | 8 | 13 | 21),
            "kept {} is not a fibonacci boundary",
            kept
        );
        // Snapping never violates the cap.
        let suffix = &adds[adds.len() - kept..];
        assert!(build_segment(BASE, "j:cm9vdHJvb3Q", suffix).url.len() <= cap);
    }

    #[test]
    fn test_fit_keeps_everything_unsnapped_when_it_all_fits() {
        let adds = refs(4, 24);
        let kept = fit_to_budget(BASE, "j:cm9vdHJvb3Q", &adds, 120_000);
        assert_eq!(kept, 4);
    }

    #[test]
    fn test_fibonacci_floor() {
        assert_eq!(fibonacci_floor(0), 0);
        assert_eq!(fibonacci_floor(1), 1);
        assert_eq!(fibonacci_floor(4), 3);
        assert_eq!(fibonacci_floor(5), 5);
        assert_eq!(fibonacci_floor(7), 5);
        assert_eq!(fibonacci_floor(8), 8);
        assert_eq!(fibonacci_floor(20), 13);
    }

    #[test]
    fn test_depth_guard_never_busts_cap() {
        // A cap that admits roughly one ancestor per level forces deep
        // recursion; the guard must cut it off without ever exceeding
        // the cap.
        let adds = refs(80, 40);
        let cap = build_segment(BASE, &adds[0], &adds[..1]).url.len() + 8;
        let pack = build_segmented_pack(BASE, "j:cm9vdHJvb3Q", &adds, &SegmentBudget::with_fragment_cap(cap));
        assert!(pack.primary.url.len() <= cap);
        for archive in &pack.archives {
            assert!(archive.url.len() <= cap);
        }
        assert!(pack.archives.len() <= MAX_ARCHIVE_DEPTH + 1);
    }
}
