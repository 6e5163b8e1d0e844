//! The ancestor-link store
//!
//! Keys are content keys; each node links to at most one predecessor,
//! forming an acyclic singly-linked ancestor list per capsule. Reads and
//! writes are synchronous; only change notification is deferred, and it
//! is coalesced to one event per tick.

use lru::LruCache;
use memstream_core::ContentKey;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Default bound on stored nodes.
pub const DEFAULT_CAPACITY: usize = 512;

/// One ancestor link: who came before this capsule, and how to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Content key of the predecessor, when known.
    pub prev_key: Option<ContentKey>,
    /// Content-embedded payload reference for this capsule, when known.
    pub payload_ref: Option<String>,
    /// Reference used when no payload ref is known (typically a URL).
    pub fallback_ref: String,
}

impl ChainLink {
    /// The reference an ancestor list should carry for this node.
    pub fn resolved_ref(&self) -> &str {
        self.payload_ref.as_deref().unwrap_or(&self.fallback_ref)
    }
}

/// A stored node: the link plus the tick it was last written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainNode {
    pub key: ContentKey,
    pub link: ChainLink,
    pub tick: u64,
}

/// Counters for observability.
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphStats {
    /// Upserts that changed state.
    pub upserts: u64,
    /// Upserts that matched the stored link exactly.
    pub no_ops: u64,
    /// Nodes dropped by the capacity bound.
    pub evictions: u64,
}

struct State {
    version: u64,
    tick: u64,
    dirty: bool,
    stats: GraphStats,
}

struct Inner {
    nodes: RwLock<LruCache<ContentKey, ChainNode>>,
    state: Mutex<State>,
    event_tx: broadcast::Sender<u64>,
}

/// Versioned, bounded, batched-notification store of ancestor links.
///
/// Cloning the handle shares the underlying store; pass it into
/// consumers explicitly rather than holding ambient module state.
#[derive(Clone)]
pub struct ChainGraph {
    inner: Arc<Inner>,
}

impl Default for ChainGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChainGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.inner.nodes.read();
        let state = self.inner.state.lock();
        f.debug_struct("ChainGraph")
            .field("len", &nodes.len())
            .field("version", &state.version)
            .field("tick", &state.tick)
            .finish()
    }
}

impl ChainGraph {
    /// Create a graph with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a graph bounded to `capacity` nodes (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                nodes: RwLock::new(LruCache::new(
                    NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1"),
                )),
                state: Mutex::new(State {
                    version: 0,
                    tick: 0,
                    dirty: false,
                    stats: GraphStats::default(),
                }),
                event_tx,
            }),
        }
    }

    /// Insert or replace the link for `key`.
    ///
    /// A link identical to the stored one is a no-op (recency is not
    /// refreshed). Any change replaces the node, refreshes its recency,
    /// bumps the version, and marks one pending notification for the
    /// current tick. Returns whether state changed.
    pub fn upsert(&self, key: ContentKey, link: ChainLink) -> bool {
        let mut nodes = self.inner.nodes.write();
        if let Some(existing) = nodes.peek(&key) {
            if existing.link == link {
                self.inner.state.lock().stats.no_ops += 1;
                return false;
            }
        }

        let mut state = self.inner.state.lock();
        state.version += 1;
        state.dirty = true;
        state.stats.upserts += 1;
        let node = ChainNode {
            key: key.clone(),
            link,
            tick: state.tick,
        };
        if let Some((evicted, _)) = nodes.push(key.clone(), node) {
            if evicted != key {
                state.stats.evictions += 1;
                debug!(key = %evicted, "evicted chain node at capacity");
            }
        }
        true
    }

    /// Read a node without refreshing its recency.
    pub fn get(&self, key: &ContentKey) -> Option<ChainNode> {
        self.inner.nodes.read().peek(key).cloned()
    }

    /// Whether a node is stored for `key`.
    pub fn contains(&self, key: &ContentKey) -> bool {
        self.inner.nodes.read().contains(key)
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.inner.nodes.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the ancestor reference list for `key`, oldest first.
    ///
    /// Follows `prev` links for up to `limit` hops, stopping on a missing
    /// node or a repeated key, and collects each ancestor's payload ref
    /// (falling back to its fallback ref). The starting node itself is
    /// not included.
    pub fn ancestor_refs(&self, key: &ContentKey, limit: usize) -> Vec<String> {
        let nodes = self.inner.nodes.read();
        let mut out = Vec::new();
        let mut seen: HashSet<ContentKey> = HashSet::new();
        seen.insert(key.clone());

        let mut current = match nodes.peek(key) {
            Some(node) => node,
            None => return out,
        };
        while out.len() < limit {
            let prev_key = match &current.link.prev_key {
                Some(k) => k,
                None => break,
            };
            if !seen.insert(prev_key.clone()) {
                debug!(key = %prev_key, "ancestor walk hit a repeated key");
                break;
            }
            let prev = match nodes.peek(prev_key) {
                Some(node) => node,
                None => break,
            };
            out.push(prev.link.resolved_ref().to_string());
            current = prev;
        }
        out.reverse();
        out
    }

    /// Current version (bumped on every state change).
    pub fn version(&self) -> u64 {
        self.inner.state.lock().version
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> GraphStats {
        self.inner.state.lock().stats
    }

    /// Subscribe to batched change notifications.
    ///
    /// Each received value is the graph version at a tick boundary; no
    /// intermediate versions are ever delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.inner.event_tx.subscribe()
    }

    /// Close the current tick.
    ///
    /// If any upsert changed state since the previous flush, emits exactly
    /// one notification carrying the final version and returns it;
    /// otherwise does nothing.
    pub fn flush(&self) -> Option<u64> {
        let version = {
            let mut state = self.inner.state.lock();
            if !state.dirty {
                return None;
            }
            state.dirty = false;
            state.tick += 1;
            state.version
        };
        let _ = self.inner.event_tx.send(version);
        Some(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn key(s: &str) -> ContentKey {
        ContentKey::from_raw(s)
    }

    fn link(prev: Option<&str>, payload: Option<&str>, fallback: &str) -> ChainLink {
        ChainLink {
            prev_key: prev.map(key),
            payload_ref: payload.map(String::from),
            fallback_ref: fallback.to_string(),
        }
    }

    #[test]
    fn test_upsert_and_get() {
        let graph = ChainGraph::new();
        assert!(graph.upsert(key("a"), link(None, Some("j:aaaa"), "url-a")));
        let node = graph.get(&key("a")).unwrap();
        assert_eq!(node.link.payload_ref.as_deref(), Some("j:aaaa"));
        assert_eq!(graph.version(), 1);
    }

    #[test]
    fn test_identical_upsert_is_noop() {
        let graph = ChainGraph::new();
        graph.upsert(key("a"), link(None, None, "url-a"));
        let v = graph.version();
        assert!(!graph.upsert(key("a"), link(None, None, "url-a")));
        assert_eq!(graph.version(), v);
        assert_eq!(graph.stats().no_ops, 1);
    }

    #[test]
    fn test_changed_upsert_replaces() {
        let graph = ChainGraph::new();
        graph.upsert(key("a"), link(None, None, "url-a"));
        assert!(graph.upsert(key("a"), link(None, Some("j:aaaa"), "url-a")));
        assert_eq!(
            graph.get(&key("a")).unwrap().link.payload_ref.as_deref(),
            Some("j:aaaa")
        );
        assert_eq!(graph.version(), 2);
    }

    #[test]
    fn test_eviction_drops_oldest_inserted() {
        let graph = ChainGraph::with_capacity(2);
        graph.upsert(key("a"), link(None, None, "url-a"));
        graph.upsert(key("b"), link(None, None, "url-b"));
        graph.upsert(key("c"), link(None, None, "url-c"));
        assert!(!graph.contains(&key("a")));
        assert!(graph.contains(&key("b")));
        assert!(graph.contains(&key("c")));
        assert_eq!(graph.stats().evictions, 1);
    }

    #[test]
    fn test_changed_upsert_refreshes_recency() {
        let graph = ChainGraph::with_capacity(2);
        graph.upsert(key("a"), link(None, None, "url-a"));
        graph.upsert(key("b"), link(None, None, "url-b"));
        // Refresh "a" with a changed link, then overflow: "b" goes first.
        graph.upsert(key("a"), link(None, Some("j:aaaa"), "url-a"));
        graph.upsert(key("c"), link(None, None, "url-c"));
        assert!(graph.contains(&key("a")));
        assert!(!graph.contains(&key("b")));
    }

    #[test]
    fn test_ancestor_refs_oldest_first() {
        let graph = ChainGraph::new();
        graph.upsert(key("p1"), link(None, Some("j:p1ref"), "url-1"));
        graph.upsert(key("p2"), link(Some("p1"), None, "url-2"));
        graph.upsert(key("p3"), link(Some("p2"), Some("j:p3ref"), "url-3"));
        graph.upsert(key("p4"), link(Some("p3"), None, "url-4"));

        let refs = graph.ancestor_refs(&key("p4"), 16);
        assert_eq!(refs, vec!["j:p1ref", "url-2", "j:p3ref"]);
    }

    #[test]
    fn test_ancestor_refs_respects_limit() {
        let graph = ChainGraph::new();
        graph.upsert(key("p1"), link(None, None, "url-1"));
        graph.upsert(key("p2"), link(Some("p1"), None, "url-2"));
        graph.upsert(key("p3"), link(Some("p2"), None, "url-3"));

        let refs = graph.ancestor_refs(&key("p3"), 1);
        assert_eq!(refs, vec!["url-2"]);
    }

    #[test]
    fn test_ancestor_refs_stops_on_cycle() {
        let graph = ChainGraph::new();
        graph.upsert(key("a"), link(Some("b"), None, "url-a"));
        graph.upsert(key("b"), link(Some("a"), None, "url-b"));

        let refs = graph.ancestor_refs(&key("a"), 16);
        assert_eq!(refs, vec!["url-b"]);
    }

    #[test]
    fn test_ancestor_refs_stops_on_missing_node() {
        let graph = ChainGraph::new();
        graph.upsert(key("a"), link(Some("ghost"), None, "url-a"));
        assert!(graph.ancestor_refs(&key("a"), 16).is_empty());
    }

    #[test]
    fn test_notifications_are_batched_per_tick() {
        let graph = ChainGraph::new();
        let mut rx = graph.subscribe();

        graph.upsert(key("a"), link(None, None, "url-a"));
        graph.upsert(key("b"), link(None, None, "url-b"));
        graph.upsert(key("c"), link(None, None, "url-c"));

        // Nothing delivered mid-tick.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        let flushed = graph.flush().unwrap();
        assert_eq!(flushed, 3);
        assert_eq!(rx.try_recv().unwrap(), 3);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // A clean tick emits nothing.
        assert_eq!(graph.flush(), None);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
