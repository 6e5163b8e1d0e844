//! File-backed registry
//!
//! Persists each role's entries as one JSON string-array file under a
//! base directory. Reads are permissive: the current array form and the
//! legacy map form both load, and unreadable entries are skipped. Write
//! failures never affect the in-memory view; the update is simply not
//! persisted, with a warning.

use crate::error::{Error, Result};
use crate::notifier::Notifier;
use crate::store::{Registry, RegistryEntry, RegistryRole, RegistryState, UpsertOutcome};
use memstream_core::ContentKey;
use parking_lot::RwLock;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry persisted to a JSON file per role.
#[derive(Clone)]
pub struct FileRegistry {
    role: RegistryRole,
    path: PathBuf,
    state: Arc<RwLock<RegistryState>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Debug for FileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("role", &self.role)
            .field("path", &self.path)
            .field("len", &self.state.read().len())
            .finish()
    }
}

impl FileRegistry {
    /// Open (or create) the registry for `role` under `base_dir`.
    ///
    /// A missing file starts empty; an unreadable or unparseable file is
    /// treated as empty rather than failing the open.
    pub fn open(base_dir: impl AsRef<Path>, role: RegistryRole) -> Result<Self> {
        Self::open_with_notifier(base_dir, role, None)
    }

    /// Open with a notifier signaled on accepted upserts.
    pub fn open_with_notifier(
        base_dir: impl AsRef<Path>,
        role: RegistryRole,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        std::fs::create_dir_all(base_dir)
            .map_err(|e| Error::persistence(format!("create {}: {}", base_dir.display(), e)))?;
        let path = base_dir.join(role.file_name());

        let mut state = RegistryState::default();
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => state.load_permissive(&value),
                Err(e) => debug!(path = %path.display(), error = %e, "ignoring unparseable registry file"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %path.display(), error = %e, "ignoring unreadable registry file"),
        }

        Ok(Self {
            role,
            path,
            state: Arc::new(RwLock::new(state)),
            notifier,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        let blob = self.state.read().to_persisted();
        let text = match serde_json::to_string(&blob) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "registry update skipped: serialize failed");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, text) {
            warn!(path = %self.path.display(), error = %e, "registry update skipped: write failed");
        }
    }
}

impl Registry for FileRegistry {
    fn role(&self) -> RegistryRole {
        self.role
    }

    fn upsert(&self, key: &ContentKey, url: &str) -> UpsertOutcome {
        let outcome = self.state.write().upsert(key, url);
        if outcome.accepted() {
            self.persist();
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
