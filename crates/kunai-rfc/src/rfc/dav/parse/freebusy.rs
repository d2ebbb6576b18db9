//! `?cmd=freebusy` response parsing.

use crate::error::RfcResult;
use crate::rfc::xml::{ParseError, parse_document};

/// One `item` of the response: a recipient and its merged status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientFreeBusy {
    pub email: String,
    pub fbdata: String,
}

/// Extracts the recipients from a free/busy response.
///
/// Items without an address are skipped; an item without `fbdata` yields an
/// empty string, which decodes to NODATA.
///
/// ## Errors
/// Returns `RfcError::XmlParse` for malformed XML or a missing `recipients`
/// element.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_freebusy_response(xml: &[u8]) -> RfcResult<Vec<RecipientFreeBusy>> {
    let root = parse_document(xml)?;
    let recipients = if root.name == "recipients" {
        &root
    } else {
        root.find("recipients")
            .ok_or_else(|| ParseError::missing_element("recipients"))?
    };

    let mut out = Vec::new();
    for item in recipients.children_named("item") {
        let Some(email) = item.child("email").map(|e| e.text().to_string()) else {
            tracing::debug!("Skipping free/busy item without an email");
            continue;
        };
        if email.is_empty() {
            continue;
        }
        let fbdata = item
            .child("fbdata")
            .map(|e| e.text().to_string())
            .unwrap_or_default();
        out.push(RecipientFreeBusy { email, fbdata });
    }
    Ok(out)
}
