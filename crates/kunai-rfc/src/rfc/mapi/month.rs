//! Month arithmetic for the free/busy binary layout.

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, TimeZone, Utc};

/// Seconds between 1601-01-01T00:00:00Z and the Unix epoch.
const SECS_1601_TO_UNIX: i64 = 11_644_473_600;

/// Exchange month index, `year * 16 + month`.
#[must_use]
#[expect(clippy::cast_possible_wrap, reason = "month is in 1..=12")]
pub fn month_index(dt: DateTime<Utc>) -> i32 {
    dt.year() * 16 + dt.month() as i32
}

/// First instant of the month a month index refers to.
#[must_use]
pub fn start_of_month_index(index: i32) -> Option<DateTime<Utc>> {
    let year = index.div_euclid(16);
    let month = u32::try_from(index.rem_euclid(16)).ok()?;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// First instant of the month containing `dt`.
#[must_use]
pub fn month_start(dt: DateTime<Utc>) -> DateTime<Utc> {
    let date = dt.date_naive();
    (date - Days::new(u64::from(date.day0())))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// First instant of the month after the one containing `dt`.
#[must_use]
pub fn next_month_start(dt: DateTime<Utc>) -> DateTime<Utc> {
    month_start(dt) + Months::new(1)
}

/// Number of calendar months overlapped by `[start, end)`.
#[must_use]
pub fn months_spanned(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    if end <= start {
        return 0;
    }
    let mut count = 0;
    let mut cursor = month_start(start);
    while cursor < end {
        count += 1;
        cursor = next_month_start(cursor);
    }
    count
}

/// Whole minutes elapsed since 1601-01-01 UTC.
#[must_use]
pub fn minutes_since_1601(dt: DateTime<Utc>) -> i64 {
    (dt.timestamp() + SECS_1601_TO_UNIX).div_euclid(60)
}

#[must_use]
pub fn from_minutes_since_1601(minutes: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(minutes.checked_mul(60)? - SECS_1601_TO_UNIX, 0)
}
