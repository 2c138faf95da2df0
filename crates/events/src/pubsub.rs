//! Topic publish/subscribe abstraction (mechanics only).
//!
//! The pubsub transport is deliberately thin:
//!
//! - **Topic-addressed**: every publish names a topic; subscribers pick topics.
//! - **Broadcast**: each active subscriber of a topic gets its own copy.
//! - **No persistence**: subscribers that are not listening at publish time miss
//!   the message. The store is the source of truth.
//! - **Opaque payloads**: bytes in, bytes out. Consumers treat a message as a
//!   signal to re-read state rather than decode it as data.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to one topic.
///
/// Dropping the subscription unsubscribes; the transport prunes dead
/// subscribers lazily on the next publish.
///
/// ```ignore
/// let sub = pubsub.subscribe(&workspace_notify_channel(workspace_id));
/// loop {
///     match sub.recv_timeout(Duration::from_secs(1)) {
///         Ok(_payload) => refresh_workspace()?,
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic topic pubsub.
///
/// `publish` is fire-and-forget from the caller's point of view: delivery is
/// guaranteed only to subscribers active at publish time, and callers are
/// expected to log rather than fail on publish errors.
pub trait Pubsub: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    fn subscribe(&self, topic: &str) -> Subscription<Vec<u8>>;
}

impl<P> Pubsub for Arc<P>
where
    P: Pubsub + ?Sized,
{
    type Error = P::Error;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        (**self).publish(topic, payload)
    }

    fn subscribe(&self, topic: &str) -> Subscription<Vec<u8>> {
        (**self).subscribe(topic)
    }
}
