//! HTTP transport for the provisioner daemon RPCs.

pub mod app;
pub mod context;
pub mod middleware;
