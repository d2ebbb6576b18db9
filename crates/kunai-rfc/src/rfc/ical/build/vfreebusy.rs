//! `VFREEBUSY` serialization.

use std::fmt;

use chrono::{DateTime, Utc};
use kunai_core::constants::ICAL_PRODID;
use kunai_core::model::FreeBusy;

use super::fold::fold_line;
use crate::error::{RfcError, RfcResult};

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// iTIP method carried on the `VCALENDAR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItipMethod {
    Publish,
    Request,
    Reply,
}

impl ItipMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "PUBLISH",
            Self::Request => "REQUEST",
            Self::Reply => "REPLY",
        }
    }
}

impl fmt::Display for ItipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header values for a serialized free/busy object.
///
/// `method` and `organizer` are required; serialization fails without them.
#[derive(Debug, Clone, Default)]
pub struct VCalendarOptions<'a> {
    pub method: Option<ItipMethod>,
    pub organizer: Option<&'a str>,
    pub attendee: Option<&'a str>,
    pub url: Option<&'a str>,
    /// Fixed `DTSTAMP`; the current time when unset.
    pub dtstamp: Option<DateTime<Utc>>,
}

impl<'a> VCalendarOptions<'a> {
    #[must_use]
    pub fn new(method: ItipMethod, organizer: &'a str) -> Self {
        Self {
            method: Some(method),
            organizer: Some(organizer),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attendee(mut self, attendee: &'a str) -> Self {
        self.attendee = Some(attendee);
        self
    }

    #[must_use]
    pub fn url(mut self, url: &'a str) -> Self {
        self.url = Some(url);
        self
    }

    #[must_use]
    pub fn dtstamp(mut self, dtstamp: DateTime<Utc>) -> Self {
        self.dtstamp = Some(dtstamp);
        self
    }
}

/// Serializes `fb` as a `VCALENDAR` containing one `VFREEBUSY`.
///
/// Every interval that is neither FREE nor NODATA becomes a `FREEBUSY`
/// property with its `FBTYPE`.
///
/// ## Errors
/// Returns `RfcError::MissingField` if the method or organizer is unset.
pub fn serialize_vfreebusy(fb: &FreeBusy, options: &VCalendarOptions<'_>) -> RfcResult<String> {
    let method = options.method.ok_or(RfcError::MissingField("method"))?;
    let organizer = options
        .organizer
        .filter(|o| !o.is_empty())
        .ok_or(RfcError::MissingField("organizer"))?;
    let dtstamp = options.dtstamp.unwrap_or_else(Utc::now);

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        format!("PRODID:{ICAL_PRODID}"),
        "VERSION:2.0".to_string(),
        format!("METHOD:{method}"),
        "BEGIN:VFREEBUSY".to_string(),
        format!("ORGANIZER:{}", calendar_address(organizer)),
    ];
    if let Some(attendee) = options.attendee {
        lines.push(format!("ATTENDEE:{}", calendar_address(attendee)));
    }
    lines.push(format!("DTSTAMP:{}", dtstamp.format(UTC_FORMAT)));
    lines.push(format!("DTSTART:{}", fb.start().format(UTC_FORMAT)));
    lines.push(format!("DTEND:{}", fb.end().format(UTC_FORMAT)));
    if let Some(url) = options.url {
        lines.push(format!("URL:{url}"));
    }
    for interval in fb.intervals() {
        let Some(fbtype) = interval.status.fbtype() else {
            continue;
        };
        lines.push(format!(
            "FREEBUSY;FBTYPE={fbtype}:{}/{}",
            interval.start.format(UTC_FORMAT),
            interval.end.format(UTC_FORMAT)
        ));
    }
    lines.push("END:VFREEBUSY".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    Ok(out)
}

/// Bare addresses get a `mailto:` scheme; URIs pass through.
fn calendar_address(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("mailto:{address}")
    }
}

/// Serialization entry point on [`FreeBusy`] itself.
pub trait VCalendarExt {
    /// ## Errors
    /// Returns `RfcError::MissingField` if the method or organizer is unset.
    fn to_vcalendar(&self, options: &VCalendarOptions<'_>) -> RfcResult<String>;
}

impl VCalendarExt for FreeBusy {
    fn to_vcalendar(&self, options: &VCalendarOptions<'_>) -> RfcResult<String> {
        serialize_vfreebusy(self, options)
    }
}
