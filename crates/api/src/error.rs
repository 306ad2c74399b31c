use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use common::Error;

/// Maps engine errors onto HTTP responses.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::ConfigValidation(violations) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "invalid configuration",
                    "violations": violations,
                })),
            )
                .into_response(),
            other => {
                error!(kind = other.kind(), error = %other, "Request failed");
                let status = match other {
                    Error::Transient(_) | Error::Rejected(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, Json(json!({ "error": other.to_string() }))).into_response()
            }
        }
    }
}
