//! Redis pub/sub transport (optional).
//!
//! Redis pub/sub is not durable: a subscriber that is not connected at publish
//! time misses the message. That matches the notification contract, since the
//! store holds the durable facts.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use thiserror::Error;
use tracing::debug;

use provd_events::{Pubsub, Subscription};

#[derive(Debug, Error)]
pub enum RedisPubsubError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Topic pubsub over Redis channels. Each topic maps to one channel under
/// `prefix`.
#[derive(Debug, Clone)]
pub struct RedisPubsub {
    client: redis::Client,
    prefix: String,
}

impl RedisPubsub {
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, RedisPubsubError> {
        Ok(Self {
            client: redis::Client::open(redis_url.as_ref())?,
            prefix: "provd:".to_string(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn channel(&self, topic: &str) -> String {
        format!("{}{}", self.prefix, topic)
    }
}

impl Pubsub for RedisPubsub {
    type Error = RedisPubsubError;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let mut conn = self.client.get_connection()?;
        let _: i64 = conn.publish(self.channel(topic), payload)?;
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Subscription<Vec<u8>> {
        let (tx, rx) = mpsc::channel();
        let client = self.client.clone();
        let channel = self.channel(topic);

        // Forward messages until the subscription is dropped or the connection dies.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(conn) => conn,
                Err(err) => {
                    debug!(channel = %channel, error = %err, "redis subscribe: connect failed");
                    return;
                }
            };
            let mut pubsub = conn.as_pubsub();
            if let Err(err) = pubsub.subscribe(&channel) {
                debug!(channel = %channel, error = %err, "redis subscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(msg) => msg,
                    Err(_) => return,
                };
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };
                if tx.send(payload).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
