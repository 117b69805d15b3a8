use axum::{routing::get, Router};

pub mod auth;
pub mod professors;
pub mod students;
pub mod system;

/// Router for endpoints that do not require an access token.
pub fn public_router() -> Router {
    auth::public_router()
}

/// Router for all authenticated endpoints.
pub fn protected_router() -> Router {
    Router::new()
        .route("/me", get(system::me))
        .merge(auth::protected_router())
        .nest("/students", students::router())
        .nest("/professors", professors::router())
}
