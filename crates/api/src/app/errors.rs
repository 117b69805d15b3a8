use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use registrar_auth::{AuthError, FailureKind, StoreError};

/// Map a session-flow failure to its response.
///
/// Authentication and account-state failures share one external message so
/// a client cannot tell "no such user" from "wrong password" or "locked".
pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err.kind() {
        FailureKind::Authentication | FailureKind::AccountState => {
            let message = match err {
                AuthError::SessionMissing => "no session",
                AuthError::RefreshTokenInvalid => "invalid or expired session",
                _ => "invalid credentials",
            };
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
        }
        FailureKind::Conflict => json_error(StatusCode::CONFLICT, "conflict", err.to_string()),
        FailureKind::MissingResource => {
            json_error(StatusCode::NOT_FOUND, "not_found", "account no longer exists")
        }
        FailureKind::Validation => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string())
        }
        FailureKind::Internal => {
            tracing::error!(error = %err, "session flow failed");
            internal_error()
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store failure");
    internal_error()
}

pub fn internal_error() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error",
    )
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
