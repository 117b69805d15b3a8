//! Route-level authorization guard.
//!
//! Handlers call [`authorize`] with the policy for their route before
//! touching the resource. Policies only grant or deny; mapping to a response
//! happens here.

use axum::http::StatusCode;

use registrar_auth::{CallerContext, Decision, Policy};

use crate::app::errors::{json_error, store_error_to_response};

pub async fn authorize(
    policy: &Policy,
    caller: &CallerContext,
    resource: &str,
) -> Result<(), axum::response::Response> {
    match policy.evaluate(caller, resource).await {
        Ok(Decision::Granted) => Ok(()),
        Ok(Decision::Denied) => {
            tracing::info!(user_id = %caller.user_id, resource, "access denied");
            Err(json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"))
        }
        Err(e) => Err(store_error_to_response(e)),
    }
}
