use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::dto;
use crate::app::routes::run_engine;
use crate::app::services::AppServices;
use crate::context::WorkerContext;

pub async fn acquire_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(worker): Extension<WorkerContext>,
    body: Option<Json<dto::AcquireJobRequest>>,
) -> axum::response::Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let worker_id = worker.worker_id();

    match run_engine(services, move |srv| {
        srv.acquire_job(worker_id, body.supported_kinds())
    })
    .await
    {
        Ok(job) => Json(dto::AcquireJobResponse { job }).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(worker): Extension<WorkerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateJobBody>,
) -> axum::response::Response {
    let worker_id = worker.worker_id();
    let request = body.into_request(id);

    match run_engine(services, move |srv| srv.update_job(worker_id, request)).await {
        Ok(resp) => Json(resp).into_response(),
        Err(resp) => resp,
    }
}

pub async fn fail_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(worker): Extension<WorkerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::FailJobBody>,
) -> axum::response::Response {
    let worker_id = worker.worker_id();
    let request = body.into_request(id);

    match run_engine(services, move |srv| srv.fail_job(worker_id, request)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(resp) => resp,
    }
}

pub async fn complete_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(worker): Extension<WorkerContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompleteJobBody>,
) -> axum::response::Response {
    let worker_id = worker.worker_id();
    let request = body.into_request(id);

    match run_engine(services, move |srv| srv.complete_job(worker_id, request)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(resp) => resp,
    }
}
