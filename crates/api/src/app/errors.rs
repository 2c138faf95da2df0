use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use provd_infra::provisionerd::ProvisionerError;

pub fn provisioner_error_to_response(err: ProvisionerError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        ProvisionerError::MalformedInput(_) => {
            json_error(StatusCode::BAD_REQUEST, "malformed_input", message)
        }
        ProvisionerError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        ProvisionerError::InvalidState(_) => {
            json_error(StatusCode::CONFLICT, "invalid_state", message)
        }
        ProvisionerError::PermissionDenied(_) => {
            json_error(StatusCode::FORBIDDEN, "permission_denied", message)
        }
        ProvisionerError::Validation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
        }
        ProvisionerError::Schedule(_) => {
            json_error(StatusCode::FORBIDDEN, "schedule_denied", message)
        }
        ProvisionerError::Store(_) => {
            tracing::error!(error = %message, "store error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
