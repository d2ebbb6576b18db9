use std::sync::Arc;

use kunai_core::model::FreeBusyRequest;
use kunai_rfc::rfc::peer::{PeerRequest, PeerResponse};
use kunai_service::query::FreeBusyQuery;
use salvo::{Depot, Request, Response, handler, http::StatusCode, writing::Json};
use tracing::error;

use crate::app::api::render_error;
use crate::state::get_state_from_depot;

/// ## Summary
/// POST /api/fb/peer - Free/busy of principals hosted on this node, asked
/// by another node.
///
/// Only local providers answer, so a request is never forwarded again.
///
/// ## Errors
/// Returns HTTP 400 for a malformed body or window
/// Returns HTTP 500 if the query cannot run
#[handler]
pub(super) async fn peer_freebusy(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = match get_state_from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to get application state");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            return;
        }
    };

    let request: PeerRequest = match req.parse_json().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = ?e, "Failed to parse peer request");
            render_error(res, StatusCode::BAD_REQUEST, "Invalid request body");
            return;
        }
    };
    let (start, end) = match request.window() {
        Ok(window) => window,
        Err(e) => {
            render_error(res, StatusCode::BAD_REQUEST, e.to_string());
            return;
        }
    };

    tracing::debug!(count = request.principals.len(), %start, %end, "Answering peer request");

    let mut query = FreeBusyQuery::new(Arc::clone(&state.registry)).local_only();
    for principal in &request.principals {
        let fb_request = match FreeBusyRequest::new(principal.name.clone(), start, end) {
            Ok(r) => r,
            Err(e) => {
                render_error(res, StatusCode::BAD_REQUEST, e.to_string());
                return;
            }
        };
        query.add(match &principal.exclude_uid {
            Some(uid) => fb_request.excluding(uid.clone()),
            None => fb_request,
        });
    }

    let results = match query.execute().await {
        Ok(results) => results,
        Err(e) => {
            error!(error = %e, "Peer free/busy query failed");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Query failed");
            return;
        }
    };

    let mut response = PeerResponse::default();
    for principal in &request.principals {
        if let Some(fb) = results.get(&principal.name) {
            fb.write_to(&mut response);
        }
    }
    res.render(Json(response));
}
