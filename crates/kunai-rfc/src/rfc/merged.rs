//! Fixed-width merged free/busy strings.
//!
//! Each character covers one slot of a fixed number of minutes from the
//! window start: `0` free, `1` tentative, `2` busy, `3` out of office,
//! `4` no data. Both Exchange protocols answer availability queries in this
//! form.

use chrono::{DateTime, Duration, Utc};
use kunai_core::model::{FbStatus, FreeBusy, Interval};

use crate::error::{RfcError, RfcResult};

#[must_use]
pub const fn status_digit(status: FbStatus) -> char {
    match status {
        FbStatus::Free => '0',
        FbStatus::Tentative => '1',
        FbStatus::Busy => '2',
        FbStatus::Unavailable => '3',
        FbStatus::NoData => '4',
    }
}

/// ## Errors
/// Returns `RfcError::InvalidValue` for characters outside `0..=4`.
pub fn digit_status(digit: char) -> RfcResult<FbStatus> {
    match digit {
        '0' => Ok(FbStatus::Free),
        '1' => Ok(FbStatus::Tentative),
        '2' => Ok(FbStatus::Busy),
        '3' => Ok(FbStatus::Unavailable),
        '4' => Ok(FbStatus::NoData),
        other => Err(RfcError::InvalidValue(format!(
            "merged free/busy digit {other:?}"
        ))),
    }
}

/// Decodes a merged string into a free/busy over `[start, end)`.
///
/// Slots past `end` are ignored. When the string is too short to cover the
/// window, the uncovered remainder is NODATA.
///
/// ## Errors
/// Returns `RfcError::InvalidValue` for a zero slot width or a bad digit,
/// and `RfcError::CoreError` for a reversed window.
pub fn decode_merged(
    principal: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slot_minutes: u32,
    digits: &str,
) -> RfcResult<FreeBusy> {
    if slot_minutes == 0 {
        return Err(RfcError::InvalidValue("slot width of zero minutes".into()));
    }
    let slot = Duration::minutes(i64::from(slot_minutes));
    let mut fb = FreeBusy::new(principal, start, end)?;
    let mut cursor = start;
    for digit in digits.trim().chars() {
        if cursor >= end {
            break;
        }
        let status = digit_status(digit)?;
        let slot_end = (cursor + slot).min(end);
        if status != FbStatus::Free {
            fb.add_interval(Interval::new(cursor, slot_end, status)?)?;
        }
        cursor = slot_end;
    }
    if cursor < end {
        fb.add_interval(Interval::new(cursor, end, FbStatus::NoData)?)?;
    }
    Ok(fb)
}

/// Encodes `fb` with one digit per slot, each slot taking the busiest
/// status that overlaps it.
///
/// ## Errors
/// Returns `RfcError::InvalidValue` for a zero slot width.
pub fn encode_merged(fb: &FreeBusy, slot_minutes: u32) -> RfcResult<String> {
    if slot_minutes == 0 {
        return Err(RfcError::InvalidValue("slot width of zero minutes".into()));
    }
    let slot = Duration::minutes(i64::from(slot_minutes));
    let mut out = String::new();
    let mut cursor = fb.start();
    while cursor < fb.end() {
        let slot_end = (cursor + slot).min(fb.end());
        let status = fb
            .intervals()
            .filter(|i| i.start < slot_end && i.end > cursor)
            .map(|i| i.status)
            .fold(FbStatus::Free, FbStatus::combine);
        out.push(status_digit(status));
        cursor = slot_end;
    }
    Ok(out)
}
