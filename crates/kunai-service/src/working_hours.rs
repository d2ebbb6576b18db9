//! Working hours as a derived free/busy.
//!
//! A schedule has one entry per weekday, written `D:Y|N:HHMM:HHMM` and
//! comma-separated, with day 1 being Sunday and `2400` meaning end of day.
//! Hours are wall-clock times in the account's time zone.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz as ZoneTz;
use kunai_core::model::{FbStatus, FreeBusy, Interval};
use rrule::{RRule, Tz, Unvalidated};

use crate::error::{ServiceError, ServiceResult};

const BYDAY: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

/// Upper bound on expanded occurrences per weekday.
const MAX_OCCURRENCES: u16 = 1000;

fn invalid(message: impl Into<String>) -> ServiceError {
    ServiceError::InvalidScheduleSpec(message.into())
}

/// One weekday of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySchedule {
    /// 1 = Sunday through 7 = Saturday.
    pub day: u8,
    pub enabled: bool,
    /// Minutes after midnight.
    pub start: u16,
    /// Minutes after midnight; 1440 for end of day.
    pub end: u16,
}

impl DaySchedule {
    fn parse_time(text: &str) -> ServiceResult<u16> {
        if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("time {text:?} is not HHMM")));
        }
        let hour: u16 = text[..2].parse().map_err(|_| invalid(text))?;
        let minute: u16 = text[2..].parse().map_err(|_| invalid(text))?;
        if hour > 24 || minute > 59 || (hour == 24 && minute != 0) {
            return Err(invalid(format!("time {text:?} out of range")));
        }
        Ok(hour * 60 + minute)
    }
}

impl FromStr for DaySchedule {
    type Err = ServiceError;

    fn from_str(entry: &str) -> ServiceResult<Self> {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        let [day, flag, start, end] = parts.as_slice() else {
            return Err(invalid(format!("entry {entry:?} is not D:Y|N:HHMM:HHMM")));
        };
        let day: u8 = day
            .parse()
            .map_err(|_| invalid(format!("day {day:?} is not a number")))?;
        if !(1..=7).contains(&day) {
            return Err(invalid(format!("day {day} outside 1-7")));
        }
        let enabled = match *flag {
            "Y" => true,
            "N" => false,
            other => return Err(invalid(format!("flag {other:?} is not Y or N"))),
        };
        let start = Self::parse_time(start)?;
        let end = Self::parse_time(end)?;
        if end < start {
            return Err(invalid(format!("day {day} ends before it starts")));
        }
        Ok(Self {
            day,
            enabled,
            start,
            end,
        })
    }
}

/// A validated weekly schedule of exactly seven days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingHours {
    days: Vec<DaySchedule>,
}

impl FromStr for WorkingHours {
    type Err = ServiceError;

    fn from_str(schedule: &str) -> ServiceResult<Self> {
        let days = schedule
            .split(',')
            .map(str::parse::<DaySchedule>)
            .collect::<ServiceResult<Vec<_>>>()?;
        if days.len() != 7 {
            return Err(invalid(format!("expected 7 days, found {}", days.len())));
        }
        let distinct: BTreeSet<u8> = days.iter().map(|d| d.day).collect();
        if distinct.len() != days.len() {
            return Err(invalid("duplicate day"));
        }
        Ok(Self { days })
    }
}

impl WorkingHours {
    #[must_use]
    pub fn days(&self) -> &[DaySchedule] {
        &self.days
    }

    /// Free/busy over `[start, end)` where working hours are FREE and
    /// everything else, including disabled days, is BUSY-UNAVAILABLE.
    ///
    /// ## Errors
    /// Returns `ServiceError::InvalidScheduleSpec` if recurrence expansion
    /// fails and `ServiceError::CoreError` for a reversed window.
    #[tracing::instrument(skip(self))]
    pub fn free_busy(
        &self,
        principal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: ZoneTz,
    ) -> ServiceResult<FreeBusy> {
        let mut fb = FreeBusy::new(principal, start, end)?;

        // Expand on the floating local timeline with a day of slack on each
        // side; anything outside the window is clipped on insert.
        let local_start = start.with_timezone(&tz).naive_local() - Duration::days(1);
        let local_end = end.with_timezone(&tz).naive_local() + Duration::days(1);

        for day in self.days.iter().filter(|d| d.enabled && d.end > d.start) {
            for occurrence in expand_weekday(day, local_start, local_end)? {
                let span_end = occurrence + Duration::minutes(i64::from(day.end - day.start));
                let (Some(from), Some(to)) = (to_utc(tz, occurrence), to_utc(tz, span_end)) else {
                    continue;
                };
                if to > from {
                    fb.add_interval(Interval::new(from, to, FbStatus::Unavailable)?)?;
                }
            }
        }

        fb.list_mut().invert(FbStatus::Free, FbStatus::Unavailable);
        Ok(fb)
    }
}

/// Local start times of every occurrence of `day` in `[from, to]`.
fn expand_weekday(
    day: &DaySchedule,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> ServiceResult<Vec<NaiveDateTime>> {
    let byday = BYDAY[usize::from(day.day - 1)];
    let dtstart = from.date().and_hms_opt(0, 0, 0).map(|midnight| {
        midnight + Duration::minutes(i64::from(day.start)) - Duration::days(7)
    });
    let Some(dtstart) = dtstart else {
        return Err(invalid("unrepresentable window start"));
    };
    let rule = format!("FREQ=WEEKLY;BYDAY={byday}")
        .parse::<RRule<Unvalidated>>()
        .map_err(|err| invalid(err.to_string()))?;
    let set = rule
        .build(Tz::UTC.from_utc_datetime(&dtstart))
        .map_err(|err| invalid(err.to_string()))?
        .after(Tz::UTC.from_utc_datetime(&from))
        .before(Tz::UTC.from_utc_datetime(&to));
    Ok(set
        .all(MAX_OCCURRENCES)
        .dates
        .into_iter()
        .map(|dt| dt.naive_utc())
        .collect())
}

/// Maps a wall-clock time to UTC. Times skipped by a DST gap move forward
/// by the gap; ambiguous times take the earlier instant.
fn to_utc(tz: ZoneTz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
