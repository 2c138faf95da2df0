use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};

use provd_core::JobId;

use crate::app::routes::run_engine;
use crate::app::services::AppServices;

pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = run_engine(services, move |srv| {
        let job_id: JobId = id.parse()?;
        srv.cancel_job(job_id)
    })
    .await;

    match result {
        Ok(job) => Json(job).into_response(),
        Err(resp) => resp,
    }
}
