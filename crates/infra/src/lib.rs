//! Infrastructure layer: store, provisioner engine, config, transports.

pub mod audit;
pub mod config;
pub mod event_bus;
pub mod gitauth;
pub mod jobs;
pub mod provisionerd;
pub mod store;
