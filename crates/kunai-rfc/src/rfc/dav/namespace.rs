//! XML namespaces used against the Exchange public-folder WebDAV store.

use std::borrow::Cow;

/// `DAV:` namespace URI.
pub const DAV_NS: &str = "DAV:";

/// MAPI property tag namespace URI.
pub const MAPI_PROPTAG_NS: &str = "http://schemas.microsoft.com/mapi/proptag/";

/// Datatype namespace carrying `dt:dt` and `dt:v`.
pub const DATATYPE_NS: &str = "urn:uuid:c2f41010-65b3-11d1-a29f-00aa00c14882/";

/// An XML namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(pub Cow<'static, str>);

impl Namespace {
    pub const DAV: Self = Self(Cow::Borrowed(DAV_NS));
    pub const MAPI: Self = Self(Cow::Borrowed(MAPI_PROPTAG_NS));
    pub const DATATYPE: Self = Self(Cow::Borrowed(DATATYPE_NS));

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix bound to this namespace in generated documents.
    #[must_use]
    pub fn prefix(&self) -> Option<&'static str> {
        match self.0.as_ref() {
            DAV_NS => Some("a"),
            MAPI_PROPTAG_NS => Some("p"),
            DATATYPE_NS => Some("dt"),
            _ => None,
        }
    }

    /// `xmlns:<prefix>` declaration for this namespace.
    #[must_use]
    pub fn declaration(&self) -> Option<(String, &str)> {
        self.prefix()
            .map(|prefix| (format!("xmlns:{prefix}"), self.as_str()))
    }
}
