//! Exchange public-folder WebDAV codec.
//!
//! Reading goes through the `?cmd=freebusy` GET endpoint, which answers
//! with one merged status string per recipient. Publishing writes the MAPI
//! free/busy properties onto the recipient's hidden message with PROPPATCH.

pub mod build;
pub mod namespace;
pub mod parse;
pub mod target;

pub use build::build_proppatch;
pub use namespace::{DATATYPE_NS, DAV_NS, MAPI_PROPTAG_NS, Namespace};
pub use parse::{RecipientFreeBusy, parse_freebusy_response};
pub use target::{freebusy_query_url, owa_auth_url, proppatch_url};
