use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use derby_core::error::ValidationError;
use serde::Serialize;

/// Errors a race handler can return.
///
/// Unknown horses and questions are not errors at this boundary; the store
/// treats them as no-ops. Every variant renders as
/// `{"error": <message>, "code": <CODE>}` with status `400`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Body or query that could not be decoded.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl AppError {
    /// HTTP status, machine-readable code and message for this error.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Validation(ValidationError(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        tracing::debug!(status = status.as_u16(), code, error = %error, "Request rejected");
        (status, Json(ErrorBody { error, code })).into_response()
    }
}
