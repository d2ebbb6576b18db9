//! Availability model: statuses, intervals, and per-principal free/busy.

mod freebusy;
mod instance;
mod interval;
mod request;
mod status;

pub use freebusy::{FreeBusy, FreeBusySink};
pub use instance::FbInstance;
pub use interval::{Interval, IntervalList};
pub use request::FreeBusyRequest;
pub use status::FbStatus;
