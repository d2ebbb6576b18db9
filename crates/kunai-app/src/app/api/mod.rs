mod admin;
mod app_specific;
mod fb;

use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Response, Router};
use serde::Serialize;

// Re-export route constants from core
pub use kunai_core::constants::{
    ADMIN_ROUTE_COMPONENT, API_ROUTE_COMPONENT, API_ROUTE_PREFIX, FB_ROUTE_COMPONENT,
    FB_ROUTE_PREFIX, PEER_ROUTE_COMPONENT, PEER_ROUTE_PATH,
};

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn render_error(res: &mut Response, status: StatusCode, error: impl Into<String>) {
    res.status_code(status);
    res.render(Json(ErrorResponse {
        error: error.into(),
    }));
}

/// ## Summary
/// Constructs the main API router.
///
/// ## Errors
/// Returns an error if any child route handler fails to initialize.
pub fn routes() -> anyhow::Result<Router> {
    Ok(Router::with_path(API_ROUTE_COMPONENT)
        .push(app_specific::routes())
        .push(fb::routes())
        .push(admin::routes()))
}
