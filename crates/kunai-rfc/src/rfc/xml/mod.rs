//! XML plumbing shared by the WebDAV and EWS codecs.
//!
//! Parsing goes through a small element tree built from `quick-xml` events;
//! element and attribute names are kept by local name only, since Exchange
//! is inconsistent about prefixes across versions.

mod error;
mod tree;
mod writer;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use tree::{XmlElement, parse_document};
pub use writer::XmlBuilder;
