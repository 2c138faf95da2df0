//! Process-wide tracing setup shared by the provisioner binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, TracingOptions};

/// Initialize process-wide tracing with JSON output and `RUST_LOG` filtering.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init(TracingOptions::default());
}
