//! Exchange free/busy data in MAPI extended-property form.
//!
//! Availability is published per calendar month: a multi-valued list of
//! month indices plus, for each month, a binary blob of
//! `(start minute, end minute)` pairs relative to the first instant of that
//! month. One such pair of properties exists per status (busy, tentative,
//! out-of-office) and one for the merged union.

mod bitmap;
mod month;
mod proptag;
mod publish;

pub use bitmap::{MonthEvents, decode_events, encode_events};
pub use month::{
    from_minutes_since_1601, minutes_since_1601, month_index, month_start, months_spanned,
    next_month_start, start_of_month_index,
};
pub use proptag::{PropTag, PropType, PropValue, tags};
pub use publish::FreeBusyPublication;
