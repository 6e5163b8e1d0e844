//! Caller-supplied payload fetching
//!
//! The core never issues network calls. When a thread references a
//! capsule that cannot be opened locally, the caller supplies a
//! [`PayloadSource`] and composes it with [`fetch_missing`], which
//! honors an external cancellation flag between awaits.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

/// Capability for fetching a remote capsule by URL.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    /// Fetch and decode the capsule behind `url`.
    async fn fetch_payload(&self, url: &str) -> Result<Value>;
}

/// Fetch a capsule through `source`, honoring `cancel`.
///
/// The flag cancels when it becomes `true`. A dropped sender never
/// cancels; the fetch simply runs to completion.
pub async fn fetch_missing(
    source: &dyn PayloadSource,
    url: &str,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Value> {
    let cancelled = async {
        match cancel.wait_for(|flag| *flag).await {
            Ok(_) => (),
            // Sender gone: cancellation can never arrive.
            Err(_) => std::future::pending().await,
        }
    };

    tokio::select! {
        result = source.fetch_payload(url) => result,
        _ = cancelled => Err(Error::Cancelled),
    }
}
