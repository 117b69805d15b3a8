use std::sync::Arc;

use axum::{extract::State, http::StatusCode, middleware::Next, response::Response};

use registrar_auth::{AccessTokenCodec, CallerContext, Clock};

use crate::app::errors::json_error;
use crate::transport::bearer_token;

#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<AccessTokenCodec>,
    pub clock: Arc<dyn Clock>,
}

/// Verify the bearer access token and attach the caller to the request.
///
/// Stateless: signature, issuer, audience and validity window only. Nothing
/// here touches the credential store.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized = || {
        json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid access token",
        )
    };

    let token = bearer_token(req.headers()).ok_or_else(unauthorized)?;

    let claims = state
        .codec
        .verify(token, state.clock.now())
        .map_err(|e| {
            tracing::debug!(error = %e, "access token rejected");
            unauthorized()
        })?;

    req.extensions_mut().insert(CallerContext::new(claims.claims));

    Ok(next.run(req).await)
}
