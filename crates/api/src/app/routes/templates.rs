use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};

use provd_core::TemplateId;

use crate::app::dto::TemplateScheduleDto;
use crate::app::routes::run_engine;
use crate::app::services::AppServices;

/// Options in effect under the current schedule policy.
pub async fn get_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = run_engine(services, move |srv| {
        let template_id: TemplateId = id.parse()?;
        srv.template_schedule_options(template_id)
    })
    .await;

    match result {
        Ok(opts) => Json(TemplateScheduleDto::from(opts)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn put_schedule(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<TemplateScheduleDto>,
) -> axum::response::Response {
    let result = run_engine(services, move |srv| {
        let template_id: TemplateId = id.parse()?;
        srv.set_template_schedule_options(template_id, body.into())?;
        srv.template_schedule_options(template_id)
    })
    .await;

    match result {
        Ok(opts) => Json(TemplateScheduleDto::from(opts)).into_response(),
        Err(resp) => resp,
    }
}
