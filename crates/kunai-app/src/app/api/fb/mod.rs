//! Free/busy endpoints: the peer protocol, iCalendar renderings, and the
//! local-change hook.

mod changed;
mod ics;
mod peer;

use chrono::{DateTime, Utc};
use salvo::{Request, Router};

use super::{FB_ROUTE_COMPONENT, PEER_ROUTE_COMPONENT};

/// `u`, `s` and `e` query parameters: a principal and a window in epoch
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WindowParams {
    principal: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl WindowParams {
    fn from_request(req: &Request) -> Result<Self, String> {
        let principal = req
            .query::<String>("u")
            .filter(|u| !u.is_empty())
            .ok_or("missing principal (u)")?;
        let start = millis_param(req, "s")?;
        let end = millis_param(req, "e")?;
        if end < start {
            return Err(format!("window end {end} is before start {start}"));
        }
        Ok(Self {
            principal,
            start,
            end,
        })
    }
}

fn millis_param(req: &Request, key: &str) -> Result<DateTime<Utc>, String> {
    let ms = req
        .query::<i64>(key)
        .ok_or_else(|| format!("missing or non-numeric {key}"))?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| format!("{key}={ms} is out of range"))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(FB_ROUTE_COMPONENT)
        .push(Router::with_path(PEER_ROUTE_COMPONENT).post(peer::peer_freebusy))
        .push(Router::with_path("ics").get(ics::freebusy_ics))
        .push(Router::with_path("workinghours").get(ics::working_hours_ics))
        .push(Router::with_path("changed").post(changed::mailbox_changed))
}
