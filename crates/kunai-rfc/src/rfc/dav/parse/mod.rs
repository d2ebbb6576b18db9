//! WebDAV response parsing.

mod freebusy;

pub use freebusy::{RecipientFreeBusy, parse_freebusy_response};
