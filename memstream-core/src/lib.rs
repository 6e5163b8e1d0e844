//! # memstream core
//!
//! Runtime-agnostic primitives for content-addressed memory capsules:
//!
//! - The deterministic pulse clock (`pulse`): exact, reversible mapping
//!   between epoch milliseconds and pulse/beat/step calendar coordinates
//! - Canonical JSON (`canonical`): one byte string per logical value
//! - Payload references and fingerprints (`codec`): `j:`-prefixed
//!   base64url content addressing and the 64-bit FNV-1a hash primitive
//! - Merkle roots (`merkle`): order-witnessing roots over ancestor lists
//! - Content keys (`content_key`): transport-form-independent identity
//! - Capsule field access (`capsule`): the single alias-table boundary
//!   for reading "previous" pointers and pulse stamps from wild payloads
//!
//! ## Design principles
//!
//! 1. **Pure and synchronous**: no I/O, no clock reads; callers supply
//!    instants and payloads
//! 2. **Total decoding**: malformed input yields `None`/`Err`, never a
//!    panic
//! 3. **Content defines identity**: every derived form (ref, key, root)
//!    is a function of canonical JSON, not of field order or transport

pub mod canonical;
pub mod capsule;
pub mod codec;
pub mod content_key;
pub mod merkle;
pub mod pulse;

pub use canonical::{canonicalize, MAX_SAFE_INTEGER};
pub use capsule::{
    extract_prev_ref, extract_pulse, MAX_WRAPPER_DEPTH, PREV_FIELD_ALIASES, WRAPPER_FIELD_ALIASES,
};
pub use codec::{
    decode_payload_ref, encode_payload_ref, fingerprint, PayloadRef, MIN_TOKEN_LEN,
    PAYLOAD_REF_PREFIX,
};
pub use content_key::{content_key, ContentKey, ID_FIELD_ALIASES, SIGNATURE_FIELD_ALIASES};
pub use merkle::{empty_root, merkle_root};
pub use pulse::{
    epoch_ms_from_pulse, moment_from_epoch_ms, ChakraDay, DayArc, Moment, BEATS_PER_DAY,
    DAYS_PER_MONTH, DAYS_PER_YEAR, GENESIS_EPOCH_MS, MONTHS_PER_YEAR, PULSES_PER_DAY, PULSE_MS,
    STEPS_PER_BEAT,
};
