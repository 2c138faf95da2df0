//! In-memory pubsub for tests/dev and single-process deployments.

use std::collections::HashMap;
use std::sync::{Mutex, mpsc};

use crate::pubsub::{Pubsub, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum InMemoryPubsubError {
    /// Publish failed due to internal lock poisoning.
    #[error("pubsub lock poisoned")]
    Poisoned,
}

/// In-memory topic pubsub.
///
/// - No IO / no async
/// - Best-effort fan-out per topic
/// - Subscribers that went away are dropped while publishing
#[derive(Debug, Default)]
pub struct InMemoryPubsub {
    topics: Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
}

impl InMemoryPubsub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers on a topic as of the last publish.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .map(|t| t.get(topic).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl Pubsub for InMemoryPubsub {
    type Error = InMemoryPubsubError;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let mut topics = self.topics.lock().map_err(|_| InMemoryPubsubError::Poisoned)?;

        if let Some(subs) = topics.get_mut(topic) {
            subs.retain(|tx| tx.send(payload.to_vec()).is_ok());
            if subs.is_empty() {
                topics.remove(topic);
            }
        }

        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Subscription<Vec<u8>> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages.
        if let Ok(mut topics) = self.topics.lock() {
            topics.entry(topic.to_string()).or_default().push(tx);
        }

        Subscription::new(rx)
    }
}
