//! # memstream thread
//!
//! Reconstructs conversation threads purely from the chains embedded in
//! memory-stream URLs:
//!
//! - `chain`: witness-chain extraction and reference normalization
//! - `resolver`: thread-root resolution (explicit chain first, bounded
//!   iterative previous-pointer walk otherwise)
//! - `assemble`: deduplicated thread views from a candidate pool, with
//!   chain-graph and registry feedback
//! - `share`: the authoring flow (seal, record, pack)
//! - `remote`: the caller-supplied async fetch seam with cancellation
//!
//! All resolution paths are synchronous and bounded; cycles truncate
//! silently at the first repeated content key.

pub mod assemble;
pub mod chain;
pub mod error;
pub mod remote;
pub mod resolver;
pub mod share;

pub use assemble::{assemble_thread, DisplayRole, ThreadItem, ThreadView};
pub use chain::{extract_add_chain, normalize_ancestor_ref, MAX_CHAIN_DEPTH};
pub use error::{Error, Result};
pub use remote::{fetch_missing, PayloadSource};
pub use resolver::{capsule_at, resolve_thread_root, MAX_WALK_STEPS};
pub use share::share_capsule;
