use salvo::{Depot, Request, Response, handler, http::StatusCode, writing::Json};
use serde::Serialize;
use tracing::error;

use crate::app::api::render_error;
use crate::state::get_state_from_depot;

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub provider: String,
    /// Waiting accounts, next delivery first.
    pub pending: Vec<String>,
}

/// ## Summary
/// GET /api/admin/queue/{provider} - Snapshot of a push provider's queue.
///
/// ## Errors
/// Returns HTTP 404 for an unknown provider
#[handler]
pub(super) async fn queue_snapshot(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = match get_state_from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to get application state");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            return;
        }
    };
    let Some(provider) = req.param::<String>("provider") else {
        render_error(res, StatusCode::BAD_REQUEST, "Missing provider");
        return;
    };

    match state.sync.pending(&provider).await {
        Ok(pending) => res.render(Json(QueueResponse { provider, pending })),
        Err(e) => render_error(res, StatusCode::NOT_FOUND, e.to_string()),
    }
}
