//! iCalendar output (RFC 5545, RFC 5546 free/busy objects).

pub mod build;

pub use build::{ItipMethod, VCalendarExt, VCalendarOptions, fold_line, serialize_vfreebusy};
