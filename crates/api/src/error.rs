use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use polychat_core::error::CoreError;
use polychat_core::relation::RelationError;
use polychat_core::store::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain and store errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `polychat_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A friend-request state-machine error.
    #[error(transparent)]
    Relation(#[from] RelationError),

    /// A store failure outside the relation engine.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Relation errors ---
            AppError::Relation(err) => classify_relation_error(err),

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_relation_error(err: &RelationError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        RelationError::InvalidTarget => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
        RelationError::TargetNotFound(_) => (StatusCode::NOT_FOUND, "USER_NOT_FOUND", message),
        RelationError::RequestNotFound => (StatusCode::NOT_FOUND, "REQUEST_NOT_FOUND", message),
        RelationError::AlreadyFriends => (StatusCode::CONFLICT, "ALREADY_FRIENDS", message),
        RelationError::RequestPending { .. } => (StatusCode::CONFLICT, "REQUEST_PENDING", message),
        RelationError::RequestAlreadyHandled => {
            (StatusCode::CONFLICT, "REQUEST_ALREADY_HANDLED", message)
        }
        RelationError::Store(store) => classify_store_error(store),
    }
}

/// Duplicate keys map to 409; every other store failure is a sanitized 500.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::Conflict(_) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "Duplicate record".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Store error");
            internal()
        }
    }
}
