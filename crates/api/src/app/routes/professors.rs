use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use registrar_auth::CallerContext;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::authorize;

pub fn router() -> Router {
    Router::new().route("/:identifier", get(get_professor))
}

/// Read a professor record by code or numeric id. Owner or admin only.
pub async fn get_professor(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(identifier): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authorize(&services.professor_owner, &caller, &identifier).await {
        return denied;
    }

    match services.directory.find_professor(&identifier).await {
        Ok(Some(professor)) => {
            (StatusCode::OK, Json(dto::ProfileResponse::from(professor))).into_response()
        }
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "professor not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
