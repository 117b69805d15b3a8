use axum::{extract::Extension, http::StatusCode, Json};

use registrar_auth::{CallerContext, ClaimSet};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// The caller's claims, exactly as carried by the access token.
pub async fn me(Extension(caller): Extension<CallerContext>) -> Json<ClaimSet> {
    Json(caller.claims)
}
