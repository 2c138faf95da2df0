//! Topic-addressed notifications.
//!
//! The control plane signals observers ("a workspace changed", "a job appended
//! logs") over a pubsub transport. Notifications are real-time hints only: the
//! durable facts live in the store and consumers re-fetch them.

pub mod in_memory;
pub mod pubsub;
pub mod topics;

pub use in_memory::{InMemoryPubsub, InMemoryPubsubError};
pub use pubsub::{Pubsub, Subscription};
pub use topics::{JobLogsNotifyMessage, job_logs_notify_channel, workspace_notify_channel};
