use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use riskbtc_core::CoreError;

// ==============================================================================
// Error Type
// ==============================================================================

pub(crate) enum AppError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub(super) fn map_core_error(err: CoreError) -> AppError {
    match err {
        CoreError::InvalidAddress { .. } => AppError::BadRequest(err.to_string()),
        CoreError::DataUnavailable(_) | CoreError::MalformedSnapshot(_) => {
            AppError::BadGateway(err.to_string())
        }
        CoreError::InvalidConfig(_) | CoreError::Io(_) => AppError::Internal(err.to_string()),
    }
}
