use thiserror::Error;

use provd_events::{InMemoryPubsub, InMemoryPubsubError, Pubsub, Subscription};
use provd_infra::config::ServerConfig;
use provd_infra::provisionerd::{Server, ServerOptions};
use provd_infra::store::InMemoryProvisionerStore;

#[cfg(feature = "redis")]
use provd_infra::event_bus::{RedisPubsub, RedisPubsubError};

/// The engine as wired into the HTTP app.
pub type ProvisionerServer = Server<InMemoryProvisionerStore, AppPubsub>;

#[derive(Debug, Error)]
pub enum AppPubsubError {
    #[error(transparent)]
    InMemory(#[from] InMemoryPubsubError),

    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] RedisPubsubError),
}

/// Pubsub transport selected at startup.
pub enum AppPubsub {
    InMemory(InMemoryPubsub),
    #[cfg(feature = "redis")]
    Redis(RedisPubsub),
}

impl Pubsub for AppPubsub {
    type Error = AppPubsubError;

    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        match self {
            AppPubsub::InMemory(bus) => Ok(bus.publish(topic, payload)?),
            #[cfg(feature = "redis")]
            AppPubsub::Redis(bus) => Ok(bus.publish(topic, payload)?),
        }
    }

    fn subscribe(&self, topic: &str) -> Subscription<Vec<u8>> {
        match self {
            AppPubsub::InMemory(bus) => bus.subscribe(topic),
            #[cfg(feature = "redis")]
            AppPubsub::Redis(bus) => bus.subscribe(topic),
        }
    }
}

/// Shared state behind every handler.
pub struct AppServices {
    server: ProvisionerServer,
}

impl AppServices {
    pub fn new(server: ProvisionerServer) -> Self {
        Self { server }
    }

    /// In-memory store and pubsub, configured from `config`.
    pub fn in_memory(config: &ServerConfig) -> Self {
        Self::new(Server::new(
            InMemoryProvisionerStore::new(),
            AppPubsub::InMemory(InMemoryPubsub::new()),
            ServerOptions::from_config(config),
        ))
    }

    /// Select the pubsub transport from `config`: Redis when a URL is set and
    /// the `redis` feature is enabled, in-memory otherwise.
    pub fn from_config(config: &ServerConfig) -> Result<Self, AppPubsubError> {
        Ok(Self::new(Server::new(
            InMemoryProvisionerStore::new(),
            select_pubsub(config)?,
            ServerOptions::from_config(config),
        )))
    }

    pub fn server(&self) -> &ProvisionerServer {
        &self.server
    }
}

#[cfg(feature = "redis")]
fn select_pubsub(config: &ServerConfig) -> Result<AppPubsub, AppPubsubError> {
    match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("using redis pubsub");
            Ok(AppPubsub::Redis(RedisPubsub::new(url)?))
        }
        None => Ok(AppPubsub::InMemory(InMemoryPubsub::new())),
    }
}

#[cfg(not(feature = "redis"))]
fn select_pubsub(config: &ServerConfig) -> Result<AppPubsub, AppPubsubError> {
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the redis feature is disabled; using in-memory pubsub");
    }
    Ok(AppPubsub::InMemory(InMemoryPubsub::new()))
}
