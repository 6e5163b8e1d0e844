//! # memstream graph
//!
//! An in-memory, versioned store of ancestor links. Each node records the
//! key of its predecessor plus the best reference for reconstructing its
//! payload; following `prev` links rebuilds the ancestor list for any
//! visited capsule without a backend store.
//!
//! The store is bounded (oldest non-refreshed entries are evicted first)
//! and change notifications are strictly batched: any number of upserts
//! within one tick produce exactly one event, carrying only the final
//! version.

mod chain;

pub use chain::{ChainGraph, ChainLink, ChainNode, GraphStats, DEFAULT_CAPACITY};
