use kunai_service::error::ServiceError;
use salvo::{Depot, Request, Response, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::app::api::render_error;
use crate::state::get_state_from_depot;

/// ## Summary
/// Explicit push request payload
#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub provider: String,
    pub accounts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    /// Accounts newly queued; ones already waiting are not counted.
    pub added: usize,
}

/// ## Summary
/// POST /api/admin/push - Queue a list of accounts for one push provider,
/// typically to publish a whole domain the first time.
///
/// ## Errors
/// Returns HTTP 400 for a malformed body or a malformed account id
/// Returns HTTP 404 for an unknown provider
/// Returns HTTP 507 once the provider's queue is full
#[handler]
pub(super) async fn push_accounts(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = match get_state_from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to get application state");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            return;
        }
    };
    let push: PushRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse push request");
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };

    match state.sync.push_accounts(&push.provider, &push.accounts).await {
        Ok(added) => res.render(Json(PushResponse { added })),
        Err(e @ ServiceError::InvalidAccountId(_)) => {
            render_error(res, StatusCode::BAD_REQUEST, e.to_string());
        }
        Err(e @ ServiceError::NotFound(_)) => {
            render_error(res, StatusCode::NOT_FOUND, e.to_string());
        }
        Err(e @ ServiceError::QueueOverflow(_)) => {
            render_error(res, StatusCode::INSUFFICIENT_STORAGE, e.to_string());
        }
        Err(e) => {
            error!(error = %e, provider = %push.provider, "Explicit push failed");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Push failed");
        }
    }
}
