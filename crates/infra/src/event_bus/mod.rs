//! Pubsub transports backed by external infrastructure.
//!
//! The `Pubsub` abstraction and the in-process transport live in
//! `provd-events`; this module adds transports that need a network service.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisPubsub, RedisPubsubError};
