//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: engine wiring (store, pubsub transport, options)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router around already-wired services.
pub fn build_app(services: Arc<AppServices>) -> Router {
    // Daemon routes: require a worker identity.
    let provisionerd = routes::provisionerd_router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn(middleware::worker_identity_middleware));

    let control = routes::control_router().layer(Extension(services));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/provisionerd", provisionerd)
        .merge(control)
        .layer(ServiceBuilder::new())
}
