use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use runflow::Error;

use super::dto::ErrorBody;

/// Newtype over the core error enum so this crate can impl the foreign
/// `IntoResponse` trait — the one and only place that translates §7's
/// taxonomy into a status code; nothing else in this crate matches on error
/// *messages*.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            Error::JobNotFound(_) | Error::RunNotFound(_) => {
                tracing::info!(error = %self.0, "not found");
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            Error::InvalidCronExpression { .. } => {
                tracing::info!(error = %self.0, "invalid cron expression");
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            Error::Validation(_) => {
                tracing::info!(error = %self.0, "validation error");
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            Error::RunAssignmentFailed { .. } => {
                tracing::info!(error = %self.0, "run assignment failed");
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            Error::RunCompletionFailed { .. } => {
                tracing::info!(error = %self.0, "run completion failed");
                (StatusCode::UNPROCESSABLE_ENTITY, self.0.to_string())
            }
            Error::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
