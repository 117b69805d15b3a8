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
    Router::new().route("/:identifier", get(get_student))
}

/// Read a student record by code or numeric id. Owner or admin only.
pub async fn get_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(identifier): Path<String>,
) -> axum::response::Response {
    if let Err(denied) = authorize(&services.student_owner, &caller, &identifier).await {
        return denied;
    }

    match services.directory.find_student(&identifier).await {
        Ok(Some(student)) => {
            (StatusCode::OK, Json(dto::ProfileResponse::from(student))).into_response()
        }
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "student not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
