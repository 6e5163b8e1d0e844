//! Cross-context change signaling
//!
//! Other contexts (tabs, workers, peer processes) must learn that a
//! registry changed without receiving the payload itself: the signal is
//! "state changed, re-read", nothing more. The transport is abstract:
//! core logic depends only on the [`Notifier`] capability, and hosts
//! plug in whatever broadcast primitive their platform offers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use tokio::sync::broadcast;

/// Capability for publishing and subscribing to lightweight topic signals.
pub trait Notifier: Send + Sync + Debug {
    /// Announce that the state behind `topic` changed.
    fn publish(&self, topic: &str);

    /// Subscribe to signals for `topic`. Each received value is the topic
    /// name; subscribers re-read the store on receipt.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<String>;
}

/// In-process notifier backed by one broadcast channel per topic.
#[derive(Debug, Default)]
pub struct BroadcastNotifier {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl BroadcastNotifier {
    /// Create an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        if let Some(tx) = self.channels.read().get(topic) {
            return tx.clone();
        }
        let mut channels = self.channels.write();
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, topic: &str) {
        // No receivers is fine; the signal is best-effort.
        let _ = self.sender(topic).send(topic.to_string());
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        self.sender(topic).subscribe()
    }
}
