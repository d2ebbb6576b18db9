//! iCalendar serialization.
//!
//! - Fold: content line folding at 75 octets
//! - VFreeBusy: `VCALENDAR` wrapping one `VFREEBUSY` built from a [`FreeBusy`](kunai_core::model::FreeBusy)

mod fold;
mod vfreebusy;

pub use fold::fold_line;
pub use vfreebusy::{ItipMethod, VCalendarExt, VCalendarOptions, serialize_vfreebusy};
