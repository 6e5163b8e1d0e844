//! # memstream registry
//!
//! A persisted, cross-context, monotonically-improving map from content
//! key to the best-known URL for that capsule. "Best" never regresses:
//! an entry's score (witness-chain depth first, URL length second) only
//! increases over the life of a key.
//!
//! Two registries exist side by side, one per [`RegistryRole`]: the
//! content registry (individual capsules) and the feed registry (stream
//! entries). Both persist as plain string arrays and load permissively,
//! including legacy map-shaped blobs.
//!
//! Cross-context observers receive a lightweight "state changed,
//! re-read" signal through the [`Notifier`] capability; in-process
//! readers simply share the store handle.

mod error;
mod file;
mod notifier;
mod score;
mod store;

pub use error::{Error, Result};
pub use file::FileRegistry;
pub use notifier::{BroadcastNotifier, Notifier};
pub use score::{witness_depth, UrlScore};
pub use store::{MemoryRegistry, Registry, RegistryEntry, RegistryRole, UpsertOutcome};
