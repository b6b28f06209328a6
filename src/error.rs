use aide::OperationOutput;
use axum::{http::StatusCode, response::IntoResponse, Json};
use schemars::JsonSchema;
use serde_json::json;

/// Represent errors in the application
///
/// All `ServiceError`s can be transformed to http errors.
#[derive(Debug, Clone, JsonSchema)]
pub enum ServiceError {
    InternalServerError(String),
    BadRequest(String),
    Unauthorized(&'static str),
    Forbidden(&'static str),
    /// The targeted entity was concurrently modified, eg a second manager
    /// already decided a pending request.
    Conflict(String),
    NotFound,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for ServiceError {}

/// Helper for `ServiceError` result
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<sqlx::Error> for ServiceError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => ServiceError::NotFound,
            // foreign_key_violation, eg deleting a reward that redemptions
            // still reference
            sqlx::Error::Database(e) if e.code().as_deref() == Some("23503") => {
                ServiceError::Conflict("Still referenced by other records.".to_string())
            }
            error => ServiceError::InternalServerError(error.to_string()),
        }
    }
}

impl OperationOutput for ServiceError {
    type Inner = String;
}
impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServiceError::InternalServerError(ref cause) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "cause": cause })),
            ),
            ServiceError::BadRequest(ref cause) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "cause": cause })))
            }
            ServiceError::Unauthorized(cause) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "cause": cause })))
            }
            ServiceError::Forbidden(cause) => {
                (StatusCode::FORBIDDEN, Json(json!({ "cause": cause })))
            }
            ServiceError::Conflict(ref cause) => {
                (StatusCode::CONFLICT, Json(json!({ "cause": cause })))
            }
            ServiceError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not found",
                })),
            ),
        }
        .into_response()
    }
}
