//! Registry stores
//!
//! A registry maps content keys to the best URL known so far. The score
//! of a stored entry only ever increases: an upsert inserts a missing
//! key, replaces the stored URL in place only when the new one strictly
//! out-scores it (keeping the entry's original position), and is a no-op
//! otherwise, so re-registering an already-best URL is idempotent.

use crate::notifier::Notifier;
use crate::score::UrlScore;
use memstream_core::ContentKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Which persisted store a registry handle is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryRole {
    /// Individual capsule URLs.
    Content,
    /// Feed/stream entry URLs.
    Feed,
}

impl RegistryRole {
    /// Key under which this role's state is persisted.
    pub fn storage_key(&self) -> &'static str {
        match self {
            RegistryRole::Content => "memstream.registry.content",
            RegistryRole::Feed => "memstream.registry.feed",
        }
    }

    /// File name used by the file backend.
    pub fn file_name(&self) -> &'static str {
        match self {
            RegistryRole::Content => "content-registry.json",
            RegistryRole::Feed => "feed-registry.json",
        }
    }

    /// Topic for cross-context change signals.
    pub fn topic(&self) -> &'static str {
        match self {
            RegistryRole::Content => "registry/content",
            RegistryRole::Feed => "registry/feed",
        }
    }
}

/// Outcome of a registry upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No entry existed for the key.
    Inserted,
    /// The new URL strictly out-scored the stored one.
    Improved,
    /// The stored URL is at least as good; nothing changed.
    Unchanged,
}

impl UpsertOutcome {
    /// Whether the store changed.
    pub fn accepted(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

/// One stored registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub key: ContentKey,
    pub url: String,
    pub score: UrlScore,
}

/// Read/upsert interface shared by all registry backends.
pub trait Registry: Send + Sync + Debug {
    /// The role this handle is scoped to.
    fn role(&self) -> RegistryRole;

    /// Register `url` as a candidate for `key`.
    fn upsert(&self, key: &ContentKey, url: &str) -> UpsertOutcome;

    /// Best-known URL for `key`.
    fn best(&self, key: &ContentKey) -> Option<String>;

    /// All entries in original insertion order.
    fn entries(&self) -> Vec<RegistryEntry>;

    /// Number of stored keys.
    fn len(&self) -> usize;

    /// Whether the registry is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Position-preserving entry list with a key index.
///
/// Backend-agnostic: both the memory and file registries mutate through
/// this state so the monotonic-score invariant lives in one place.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    entries: Vec<RegistryEntry>,
    index: HashMap<ContentKey, usize>,
}

impl RegistryState {
    pub(crate) fn upsert(&mut self, key: &ContentKey, url: &str) -> UpsertOutcome {
        let score = UrlScore::of(url);
        match self.index.get(key) {
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(RegistryEntry {
                    key: key.clone(),
                    url: url.to_string(),
                    score,
                });
                UpsertOutcome::Inserted
            }
            Some(&pos) => {
                let entry = &mut self.entries[pos];
                if score > entry.score {
                    entry.url = url.to_string();
                    entry.score = score;
                    UpsertOutcome::Improved
                } else {
                    UpsertOutcome::Unchanged
                }
            }
        }
    }

    pub(crate) fn best(&self, key: &ContentKey) -> Option<String> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].url.clone())
    }

    pub(crate) fn entries(&self) -> Vec<RegistryEntry> {
        self.entries.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Load entries from a persisted JSON value, permissively.
    ///
    /// Accepts the current string-array form (`"<key> <url>"` per entry)
    /// and the legacy map form (`{key: url}`). Entries that fit neither
    /// shape are skipped.
    pub(crate) fn load_permissive(&mut self, value: &serde_json::Value) {
        match value {
            serde_json::Value::Array(items) => {
                for item in items {
                    let Some(line) = item.as_str() else {
                        debug!("skipping non-string registry entry");
                        continue;
                    };
                    let Some((key, url)) = line.split_once(' ') else {
                        debug!(entry = line, "skipping malformed registry entry");
                        continue;
                    };
                    if key.is_empty() || url.is_empty() {
                        debug!(entry = line, "skipping empty registry entry");
                        continue;
                    }
                    self.upsert(&ContentKey::from_raw(key), url);
                }
            }
            serde_json::Value::Object(map) => {
                // Legacy map-shaped blob.
                for (key, url) in map {
                    match url.as_str() {
                        Some(url) if !url.is_empty() => {
                            self.upsert(&ContentKey::from_raw(key.as_str()), url);
                        }
                        _ => debug!(key = key.as_str(), "skipping legacy registry entry"),
                    }
                }
            }
            _ => debug!("unrecognized registry blob shape, starting empty"),
        }
    }

    /// Serialize to the persisted string-array form.
    pub(crate) fn to_persisted(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.entries
                .iter()
                .map(|e| serde_json::Value::String(format!("{} {}", e.key, e.url)))
                .collect(),
        )
    }
}

/// In-memory registry handle.
#[derive(Clone)]
pub struct MemoryRegistry {
    role: RegistryRole,
    state: Arc<RwLock<RegistryState>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Debug for MemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("role", &self.role)
            .field("len", &self.state.read().len())
            .finish()
    }
}

impl MemoryRegistry {
    /// Create an empty registry for `role`.
    pub fn new(role: RegistryRole) -> Self {
        Self {
            role,
            state: Arc::new(RwLock::new(RegistryState::default())),
            notifier: None,
        }
    }

    /// Create an empty registry that signals `notifier` on accepted
    /// upserts.
    pub fn with_notifier(role: RegistryRole, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            role,
            state: Arc::new(RwLock::new(RegistryState::default())),
            notifier: Some(notifier),
        }
    }
}

impl Registry for MemoryRegistry {
    fn role(&self) -> RegistryRole {
        self.role
    }

    fn upsert(&self, key: &ContentKey, url: &str) -> UpsertOutcome {
        let outcome = self.state.write().upsert(key, url);
        if outcome.accepted() {
            if let Some(notifier) = &self.notifier {
                notifier.publish(self.role.topic());
            }
        }
        outcome
    }

    fn best(&self, key: &ContentKey) -> Option<String> {
        self.state.read().best(key)
    }

    fn entries(&self) -> Vec<RegistryEntry> {
        self.state.read().entries()
    }

    fn len(&self) -> usize {
        self.state.read().len()
    }
}
