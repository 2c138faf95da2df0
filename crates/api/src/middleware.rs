use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use provd_core::WorkerId;

use crate::context::WorkerContext;

pub const DAEMON_ID_HEADER: &str = "x-provisioner-daemon-id";

pub async fn worker_identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let worker_id = extract_worker_id(req.headers())?;

    req.extensions_mut().insert(WorkerContext::new(worker_id));

    Ok(next.run(req).await)
}

fn extract_worker_id(headers: &HeaderMap) -> Result<WorkerId, StatusCode> {
    let header = headers
        .get(DAEMON_ID_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    header.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)
}
