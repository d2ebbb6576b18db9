//! Request URLs on the Exchange server.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{RfcError, RfcResult};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Folder holding the per-recipient free/busy messages.
const FREEBUSY_FOLDER: &str = "public/NON_IPM_SUBTREE/SCHEDULE%2B%20FREE%20BUSY";

/// Legacy DN separators are written as this escape in folder names.
const DN_SEPARATOR: &str = "_xF8FF_";

fn base(server: &str) -> String {
    server.trim_end_matches('/').to_string()
}

/// `GET` URL asking for merged free/busy of several recipients at once.
///
/// ## Errors
/// Returns `RfcError::Url` if `server` is not a valid base URL.
pub fn freebusy_query_url(
    server: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slot_minutes: u32,
    addresses: &[&str],
) -> RfcResult<Url> {
    let mut url = Url::parse(&format!("{}/public/", base(server)))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("cmd", "freebusy")
            .append_pair("start", &start.format(ISO_FORMAT).to_string())
            .append_pair("end", &end.format(ISO_FORMAT).to_string())
            .append_pair("interval", &slot_minutes.to_string());
        for address in addresses {
            query.append_pair("u", &format!("SMTP:{address}"));
        }
    }
    Ok(url)
}

/// `PROPPATCH` target for one recipient's free/busy message.
///
/// `org` is the legacy organization DN, for example
/// `/o=First Organization/ou=First Administrative Group`. The org and CN
/// segments are percent-encoded as path segments.
///
/// ## Errors
/// Returns `RfcError::Url` if `server` is not a valid base URL and
/// `RfcError::InvalidValue` if it cannot carry a path.
pub fn proppatch_url(server: &str, org: &str, cn: &str) -> RfcResult<Url> {
    let org = org.trim_start_matches('/').replace('/', DN_SEPARATOR);
    let mut url = Url::parse(&format!("{}/{FREEBUSY_FOLDER}", base(server)))?;
    url.path_segments_mut()
        .map_err(|()| RfcError::InvalidValue(format!("{server} cannot be a base URL")))?
        .pop_if_empty()
        .push(&format!("EX:{DN_SEPARATOR}{org}"))
        .push("USER-")
        .push("CN=RECIPIENTS")
        .push(&format!("CN={cn}.EML"));
    Ok(url)
}

/// Outlook Web Access form login endpoint.
///
/// ## Errors
/// Returns `RfcError::Url` if `server` is not a valid base URL.
pub fn owa_auth_url(server: &str) -> RfcResult<Url> {
    Ok(Url::parse(&format!(
        "{}/exchweb/bin/auth/owaauth.dll",
        base(server)
    ))?)
}
