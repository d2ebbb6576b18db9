use thiserror::Error;

use crate::rfc::xml::ParseError;

/// Wire format encoding and decoding errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] ParseError),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SOAP fault {code}: {message}")]
    SoapFault { code: String, message: String },

    #[error("EWS error {code}: {message}")]
    EwsError { code: String, message: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    CoreError(#[from] kunai_core::error::CoreError),
}

impl From<std::io::Error> for RfcError {
    fn from(err: std::io::Error) -> Self {
        Self::XmlWrite(err.to_string())
    }
}

impl From<quick_xml::Error> for RfcError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlWrite(err.to_string())
    }
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
