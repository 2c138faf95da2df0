use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};

use provd_infra::provisionerd::ProvisionerError;

use crate::app::errors;
use crate::app::services::{AppServices, ProvisionerServer};

pub mod jobs;
pub mod provisionerd;
pub mod system;
pub mod templates;

/// Daemon-facing RPCs. Every route requires a worker identity.
pub fn provisionerd_router() -> Router {
    Router::new()
        .route("/acquire", post(provisionerd::acquire_job))
        .route("/jobs/:id/update", post(provisionerd::update_job))
        .route("/jobs/:id/fail", post(provisionerd::fail_job))
        .route("/jobs/:id/complete", post(provisionerd::complete_job))
}

/// Operator-facing routes.
pub fn control_router() -> Router {
    Router::new()
        .route("/jobs/:id/cancel", post(jobs::cancel_job))
        .route(
            "/templates/:id/schedule",
            get(templates::get_schedule).put(templates::put_schedule),
        )
}

/// Run an engine call off the async runtime; the store and pubsub may block.
pub async fn run_engine<T, F>(
    services: Arc<AppServices>,
    call: F,
) -> Result<T, axum::response::Response>
where
    T: Send + 'static,
    F: FnOnce(&ProvisionerServer) -> Result<T, ProvisionerError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(services.server()))
        .await
        .map_err(|e| {
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
        })?
        .map_err(errors::provisioner_error_to_response)
}
