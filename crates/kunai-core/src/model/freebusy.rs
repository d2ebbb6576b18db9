use chrono::{DateTime, Utc};

use super::{FbInstance, FbStatus, Interval, IntervalList};
use crate::error::CoreResult;

/// Receiver for a serialized [`FreeBusy`].
///
/// Response encoders implement this to pull the availability out without
/// depending on the interval representation.
pub trait FreeBusySink {
    fn begin(&mut self, principal: &str, start: DateTime<Utc>, end: DateTime<Utc>);
    fn interval(&mut self, status: FbStatus, start: DateTime<Utc>, end: DateTime<Utc>);
    fn end(&mut self) {}
}

/// Availability of one principal over a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBusy {
    principal: String,
    list: IntervalList,
}

impl FreeBusy {
    /// A window that is entirely free.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if `end` precedes `start`.
    pub fn new(
        principal: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Self> {
        Ok(Self {
            principal: principal.into(),
            list: IntervalList::new(start, end)?,
        })
    }

    /// A window for which nothing is known.
    ///
    /// Used when no provider claims the principal, when a provider fails,
    /// and when the caller may not see the principal's calendar.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if `end` precedes `start`.
    pub fn nodata(
        principal: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Self> {
        Ok(Self {
            principal: principal.into(),
            list: IntervalList::filled(start, end, FbStatus::NoData)?,
        })
    }

    /// Builds a free/busy from appointment instances.
    ///
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if the window or any instance is reversed.
    pub fn from_instances(
        principal: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        instances: impl IntoIterator<Item = FbInstance>,
    ) -> CoreResult<Self> {
        let mut fb = Self::new(principal, start, end)?;
        for instance in instances {
            fb.add_interval(Interval::from_instance(instance)?)?;
        }
        Ok(fb)
    }

    /// Builds a free/busy from an already computed interval list.
    #[must_use]
    pub fn from_list(principal: impl Into<String>, list: IntervalList) -> Self {
        Self {
            principal: principal.into(),
            list,
        }
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.list.start()
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.list.end()
    }

    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if the interval ends before it starts.
    pub fn add_interval(&mut self, interval: Interval) -> CoreResult<()> {
        self.list.add_interval(interval)
    }

    /// Intervals in window order. Each call starts from the beginning.
    pub fn intervals(&self) -> std::slice::Iter<'_, Interval> {
        self.list.iter()
    }

    #[must_use]
    pub fn list(&self) -> &IntervalList {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut IntervalList {
        &mut self.list
    }

    /// Most severe status anywhere in the window.
    #[must_use]
    pub fn busiest(&self) -> FbStatus {
        self.list
            .iter()
            .map(|interval| interval.status)
            .fold(FbStatus::Free, FbStatus::combine)
    }

    /// True when the whole window is NODATA.
    #[must_use]
    pub fn is_nodata(&self) -> bool {
        self.list.iter().all(|interval| interval.status == FbStatus::NoData)
    }

    /// Appends this free/busy to `sink`.
    pub fn write_to<S: FreeBusySink + ?Sized>(&self, sink: &mut S) {
        sink.begin(&self.principal, self.start(), self.end());
        for interval in &self.list {
            sink.interval(interval.status, interval.start, interval.end);
        }
        sink.end();
    }
}
