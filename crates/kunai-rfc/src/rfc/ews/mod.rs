//! Exchange Web Services (SOAP) codec.
//!
//! Request builders produce complete SOAP 1.1 envelopes; response parsers
//! take the raw envelope, surface SOAP faults and per-message errors, and
//! return the payload the providers need.

mod envelope;
mod request;
mod response;

pub use envelope::{
    EWS_MESSAGES_NS, EWS_SERVER_VERSION, EWS_TYPES_NS, SOAP_ENVELOPE_NS, response_body,
    soap_envelope,
};
pub use request::{
    FolderRef, create_item, find_folder, find_item, get_user_availability, update_item,
};
pub use response::{
    FolderEntry, ItemEntry, MailboxAvailability, match_by_name, parse_availability,
    parse_create_item, parse_find_folder, parse_find_item, parse_update_item,
};
