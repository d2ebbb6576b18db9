//! Conversion between a [`FreeBusy`] and its published property set.

use chrono::{DateTime, Utc};
use kunai_core::model::{FbStatus, FreeBusy, Interval};

use super::bitmap::MonthEvents;
use super::month::{from_minutes_since_1601, minutes_since_1601, months_spanned};
use super::proptag::{PropTag, PropValue, tags};
use crate::error::{RfcError, RfcResult};

/// Everything written to the per-user free/busy item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBusyPublication {
    /// Window start in minutes since 1601.
    pub start_range: i64,
    /// Window end in minutes since 1601.
    pub end_range: i64,
    pub tentative: MonthEvents,
    pub busy: MonthEvents,
    pub oof: MonthEvents,
    /// Union of the three statuses above.
    pub merged: MonthEvents,
    pub months: i64,
    pub last_modified: DateTime<Utc>,
}

impl FreeBusyPublication {
    #[must_use]
    pub fn from_freebusy(fb: &FreeBusy, now: DateTime<Utc>) -> Self {
        let spans_with = |wanted: &dyn Fn(FbStatus) -> bool| {
            let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
            for interval in fb.intervals().filter(|i| wanted(i.status)) {
                match spans.last_mut() {
                    Some(last) if last.1 == interval.start => last.1 = interval.end,
                    _ => spans.push((interval.start, interval.end)),
                }
            }
            MonthEvents::from_spans(spans)
        };

        Self {
            start_range: minutes_since_1601(fb.start()),
            end_range: minutes_since_1601(fb.end()),
            tentative: spans_with(&|s| s == FbStatus::Tentative),
            busy: spans_with(&|s| s == FbStatus::Busy),
            oof: spans_with(&|s| s == FbStatus::Unavailable),
            merged: spans_with(&|s| s.fbtype().is_some()),
            months: months_spanned(fb.start(), fb.end()),
            last_modified: now,
        }
    }

    /// Property list in write order. Empty month lists are included so the
    /// caller can remove stale values.
    #[must_use]
    pub fn properties(&self, email: Option<&str>) -> Vec<(PropTag, PropValue)> {
        let mut props = vec![
            (tags::START_RANGE, PropValue::Long(self.start_range)),
            (tags::END_RANGE, PropValue::Long(self.end_range)),
        ];
        if let Some(email) = email {
            props.push((tags::EMAIL_ADDRESS, PropValue::Unicode(email.to_string())));
        }
        for (months_tag, events_tag, events) in [
            (tags::MERGED_MONTHS, tags::MERGED_EVENTS, &self.merged),
            (tags::TENTATIVE_MONTHS, tags::TENTATIVE_EVENTS, &self.tentative),
            (tags::BUSY_MONTHS, tags::BUSY_EVENTS, &self.busy),
            (tags::OOF_MONTHS, tags::OOF_EVENTS, &self.oof),
        ] {
            props.push((months_tag, PropValue::MvLong(events.month_indices())));
            props.push((events_tag, PropValue::MvBinary(events.encoded_events())));
        }
        props.push((tags::LAST_MODIFIED, PropValue::SysTime(self.last_modified)));
        props.push((tags::NUM_MONTHS, PropValue::Long(self.months)));
        props
    }

    /// Reads the published statuses back into a free/busy over the
    /// published range. The merged set is redundant and not consulted.
    ///
    /// ## Errors
    /// Returns `RfcError::InvalidValue` for an unrepresentable range or month,
    /// and `RfcError::CoreError` if the range is reversed.
    pub fn to_freebusy(&self, principal: &str) -> RfcResult<FreeBusy> {
        let start = from_minutes_since_1601(self.start_range)
            .ok_or_else(|| RfcError::InvalidValue(format!("start range {}", self.start_range)))?;
        let end = from_minutes_since_1601(self.end_range)
            .ok_or_else(|| RfcError::InvalidValue(format!("end range {}", self.end_range)))?;
        let mut fb = FreeBusy::new(principal, start, end)?;
        for (status, events) in [
            (FbStatus::Tentative, &self.tentative),
            (FbStatus::Busy, &self.busy),
            (FbStatus::Unavailable, &self.oof),
        ] {
            for (span_start, span_end) in events.spans()? {
                fb.add_interval(Interval::new(span_start, span_end, status)?)?;
            }
        }
        Ok(fb)
    }
}
