use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use registrar_auth::{AuthError, CallerContext, Session};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::transport;

/// Endpoints reachable without an access token.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
}

/// Endpoints that need an authenticated caller.
pub fn protected_router() -> Router {
    Router::new().route("/auth/logout", post(logout))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    match services.sessions.login(&body.email, &body.password).await {
        Ok(session) => session_response(session),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CredentialsRequest>,
) -> axum::response::Response {
    match services.sessions.register(&body.email, &body.password).await {
        Ok(claims) => (StatusCode::CREATED, Json(claims)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Some(presented) = transport::read_refresh_cookie(&headers) else {
        return errors::auth_error_to_response(AuthError::SessionMissing);
    };

    match services.sessions.refresh(presented).await {
        Ok(session) => session_response(session),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    headers: HeaderMap,
    body: Option<Json<dto::LogoutRequest>>,
) -> axum::response::Response {
    let Some(presented) = transport::read_refresh_cookie(&headers) else {
        return errors::auth_error_to_response(AuthError::SessionMissing);
    };
    let all_devices = body.is_some_and(|Json(b)| b.all_devices);

    match services
        .sessions
        .logout(&caller, presented, all_devices)
        .await
    {
        Ok(revoked) => (
            StatusCode::OK,
            [(header::SET_COOKIE, transport::cleared_refresh_cookie())],
            Json(dto::LogoutResponse { revoked }),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// 200 with the token body, and the refresh token mirrored into its cookie.
fn session_response(session: Session) -> axum::response::Response {
    let Some(cookie) = transport::refresh_cookie(
        &session.tokens.refresh_token,
        session.tokens.refresh_token_expires_at,
    ) else {
        tracing::error!("refresh token is not a valid cookie value");
        return errors::internal_error();
    };

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(dto::TokenResponse::from(session)),
    )
        .into_response()
}
