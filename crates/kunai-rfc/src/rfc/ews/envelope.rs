use crate::error::{RfcError, RfcResult};
use crate::rfc::xml::{ParseError, XmlBuilder, XmlElement, parse_document};

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const EWS_MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
pub const EWS_TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";

/// Protocol version sent in every request header.
pub const EWS_SERVER_VERSION: &str = "Exchange2010_SP1";

/// Wraps the body written by `body` in a SOAP envelope with the version header.
///
/// ## Errors
/// Returns whatever `body` returns, or `RfcError::XmlWrite`.
pub fn soap_envelope(
    body: impl FnOnce(&mut XmlBuilder) -> RfcResult<()>,
) -> RfcResult<String> {
    let mut xml = XmlBuilder::new()?;
    xml.start(
        "soap:Envelope",
        &[
            ("xmlns:soap", SOAP_ENVELOPE_NS),
            ("xmlns:m", EWS_MESSAGES_NS),
            ("xmlns:t", EWS_TYPES_NS),
        ],
    )?;
    xml.start("soap:Header", &[])?;
    xml.empty("t:RequestServerVersion", &[("Version", EWS_SERVER_VERSION)])?;
    xml.end()?;
    xml.start("soap:Body", &[])?;
    body(&mut xml)?;
    xml.end()?;
    xml.end()?;
    xml.finish()
}

/// Parses a SOAP response and returns the first element inside `Body`.
///
/// ## Errors
/// Returns `RfcError::SoapFault` for a fault body and `RfcError::XmlParse`
/// for malformed envelopes.
pub fn response_body(xml: &[u8]) -> RfcResult<XmlElement> {
    let root = parse_document(xml)?;
    let body = root
        .child("Body")
        .ok_or_else(|| ParseError::missing_element("Body"))?;
    let first = body
        .children
        .first()
        .ok_or_else(|| ParseError::missing_element("Body content"))?;
    if first.name == "Fault" {
        let code = first
            .child("faultcode")
            .map(|e| e.text().to_string())
            .unwrap_or_default();
        let message = first
            .child("faultstring")
            .map(|e| e.text().to_string())
            .unwrap_or_default();
        return Err(RfcError::SoapFault { code, message });
    }
    Ok(first.clone())
}
