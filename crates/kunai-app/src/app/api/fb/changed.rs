use kunai_core::types::ItemTypeMask;
use kunai_service::sync::validate_account_id;
use salvo::{Depot, Request, Response, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::app::api::render_error;
use crate::state::get_state_from_depot;

/// ## Summary
/// Local mailbox change notification
#[derive(Debug, Deserialize)]
pub struct MailboxChangedRequest {
    pub account_id: String,
    /// Item type names such as `appointment` or `task`.
    pub item_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MailboxChangedResponse {
    /// Number of provider queues the account was added to.
    pub queued: usize,
}

/// ## Summary
/// POST /api/fb/changed - Local-change hook. Queues the account for every
/// push provider interested in the changed item types.
///
/// Delivery happens in the background; push failures never reach the
/// caller.
///
/// ## Errors
/// Returns HTTP 400 for a malformed body, an account id that is empty or
/// holds control characters or surrounding whitespace, or no recognised
/// item type
#[handler]
pub(super) async fn mailbox_changed(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = match get_state_from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to get application state");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            return;
        }
    };
    let change: MailboxChangedRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse change notification");
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };

    let mask = ItemTypeMask::from_names(change.item_types.iter().map(String::as_str));
    if let Err(e) = validate_account_id(&change.account_id) {
        render_error(res, StatusCode::BAD_REQUEST, e.to_string());
        return;
    }
    if mask.is_empty() {
        render_error(
            res,
            StatusCode::BAD_REQUEST,
            "at least one known item type is required",
        );
        return;
    }

    let queued = state.sync.on_mailbox_changed(&change.account_id, mask).await;
    res.render(Json(MailboxChangedResponse { queued }));
}
