use std::sync::Arc;

use kunai_core::model::{FreeBusy, FreeBusyRequest};
use kunai_rfc::rfc::ical::{ItipMethod, VCalendarExt, VCalendarOptions};
use kunai_service::query::FreeBusyQuery;
use salvo::{Depot, Request, Response, handler, http::StatusCode};
use tracing::error;

use super::WindowParams;
use crate::app::api::render_error;
use crate::state::get_state_from_depot;

fn render_calendar(res: &mut Response, fb: &FreeBusy) {
    let options = VCalendarOptions::new(ItipMethod::Publish, fb.principal());
    let ics = match fb.to_vcalendar(&options) {
        Ok(ics) => ics,
        Err(e) => {
            error!(error = %e, "Failed to serialize free/busy");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Serialization failed");
            return;
        }
    };

    res.status_code(StatusCode::OK);
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Header addition failure is non-fatal"
    )]
    let _ = res.add_header(
        "Content-Type",
        salvo::http::HeaderValue::from_static("text/calendar; charset=utf-8"),
        true,
    );
    #[expect(
        clippy::let_underscore_must_use,
        reason = "Write body failure is non-fatal"
    )]
    let _ = res.write_body(ics);
}

/// ## Summary
/// GET /api/fb/ics?u=&s=&e= - Free/busy of any principal, from whichever
/// provider owns it, as a published `VFREEBUSY`.
///
/// ## Errors
/// Returns HTTP 400 for missing or malformed parameters
/// Returns HTTP 500 if the query cannot run
#[handler]
pub(super) async fn freebusy_ics(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = match get_state_from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to get application state");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            return;
        }
    };
    let params = match WindowParams::from_request(req) {
        Ok(params) => params,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, message);
            return;
        }
    };
    let request = match FreeBusyRequest::new(params.principal.clone(), params.start, params.end) {
        Ok(r) => r,
        Err(e) => {
            render_error(res, StatusCode::BAD_REQUEST, e.to_string());
            return;
        }
    };

    let mut query = FreeBusyQuery::new(Arc::clone(&state.registry));
    query.add(request);
    let fb = match query.execute().await {
        Ok(mut results) => results.remove(&params.principal),
        Err(e) => {
            error!(error = %e, principal = %params.principal, "Free/busy query failed");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Query failed");
            return;
        }
    };
    let Some(fb) = fb else {
        render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Query returned no result");
        return;
    };
    render_calendar(res, &fb);
}

/// ## Summary
/// GET /api/fb/workinghours?u=&s=&e= - Working hours of a local principal
/// as a `VFREEBUSY`; everything else comes back as NODATA.
///
/// ## Errors
/// Returns HTTP 400 for missing or malformed parameters
/// Returns HTTP 422 for a malformed stored schedule
#[handler]
pub(super) async fn working_hours_ics(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let state = match get_state_from_depot(depot) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to get application state");
            render_error(res, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            return;
        }
    };
    let params = match WindowParams::from_request(req) {
        Ok(params) => params,
        Err(message) => {
            render_error(res, StatusCode::BAD_REQUEST, message);
            return;
        }
    };

    let query = FreeBusyQuery::new(Arc::clone(&state.registry));
    match query
        .working_hours(&params.principal, params.start, params.end)
        .await
    {
        Ok(fb) => render_calendar(res, &fb),
        Err(e) => {
            error!(error = %e, principal = %params.principal, "Working hours unavailable");
            render_error(res, StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
        }
    }
}
