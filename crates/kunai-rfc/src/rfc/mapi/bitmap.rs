//! Per-month `(start minute, end minute)` event blobs.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};

use super::month::{month_index, month_start, next_month_start, start_of_month_index};
use crate::error::{RfcError, RfcResult};

/// Base64 output is broken into lines of this many characters.
const BASE64_LINE_CHARS: usize = 72;

/// Encodes minute pairs as little-endian `u16` values, base64 wrapped at 72 columns.
#[must_use]
pub fn encode_events(pairs: &[(u16, u16)]) -> String {
    let mut bytes = Vec::with_capacity(pairs.len() * 4);
    for (start, end) in pairs {
        bytes.extend_from_slice(&start.to_le_bytes());
        bytes.extend_from_slice(&end.to_le_bytes());
    }
    let encoded = STANDARD.encode(bytes);

    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_CHARS);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % BASE64_LINE_CHARS == 0 {
            out.push('\n');
        }
        out.push(c);
    }
    out
}

/// Decodes a blob produced by [`encode_events`]. Embedded whitespace is ignored.
///
/// ## Errors
/// Returns `RfcError::Base64` for invalid base64 and `RfcError::InvalidValue`
/// when the payload is not a whole number of pairs.
pub fn decode_events(encoded: &str) -> RfcResult<Vec<(u16, u16)>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    if bytes.len() % 4 != 0 {
        return Err(RfcError::InvalidValue(format!(
            "event blob of {} bytes is not a sequence of minute pairs",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| {
            (
                u16::from_le_bytes([c[0], c[1]]),
                u16::from_le_bytes([c[2], c[3]]),
            )
        })
        .collect())
}

/// Spans of one status grouped by month index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthEvents {
    months: BTreeMap<i32, Vec<(u16, u16)>>,
}

impl MonthEvents {
    /// Splits spans at month boundaries into per-month minute offsets.
    ///
    /// Spans are expected in ascending order and are truncated to whole minutes.
    #[must_use]
    pub fn from_spans(spans: impl IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>) -> Self {
        let mut months: BTreeMap<i32, Vec<(u16, u16)>> = BTreeMap::new();
        for (start, end) in spans {
            let mut cursor = start;
            while cursor < end {
                let base = month_start(cursor);
                let segment_end = end.min(next_month_start(cursor));
                months
                    .entry(month_index(cursor))
                    .or_default()
                    .push((minute_offset(base, cursor), minute_offset(base, segment_end)));
                cursor = segment_end;
            }
        }
        Self { months }
    }

    /// Rebuilds from the months and events property values.
    ///
    /// ## Errors
    /// Returns `RfcError::InvalidValue` if the lists differ in length, and
    /// decoding errors from [`decode_events`].
    pub fn from_encoded(months: &[i32], events: &[String]) -> RfcResult<Self> {
        if months.len() != events.len() {
            return Err(RfcError::InvalidValue(format!(
                "{} months but {} event blobs",
                months.len(),
                events.len()
            )));
        }
        let mut out = BTreeMap::new();
        for (month, blob) in months.iter().zip(events) {
            out.insert(*month, decode_events(blob)?);
        }
        Ok(Self { months: out })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Month indices in ascending order.
    #[must_use]
    pub fn month_indices(&self) -> Vec<i32> {
        self.months.keys().copied().collect()
    }

    /// One encoded blob per month, in the order of [`Self::month_indices`].
    #[must_use]
    pub fn encoded_events(&self) -> Vec<String> {
        self.months.values().map(|pairs| encode_events(pairs)).collect()
    }

    /// Absolute spans, with spans continuing across a month boundary joined.
    ///
    /// ## Errors
    /// Returns `RfcError::InvalidValue` for a month index that names no month.
    pub fn spans(&self) -> RfcResult<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
        let mut spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
        for (index, pairs) in &self.months {
            let base = start_of_month_index(*index)
                .ok_or_else(|| RfcError::InvalidValue(format!("bad month index {index}")))?;
            for (start, end) in pairs {
                let start = base + Duration::minutes(i64::from(*start));
                let end = base + Duration::minutes(i64::from(*end));
                match spans.last_mut() {
                    Some(last) if last.1 == start => last.1 = end,
                    _ => spans.push((start, end)),
                }
            }
        }
        Ok(spans)
    }
}

/// Minutes from `base` to `at`; at most 44 640 for a 31-day month.
fn minute_offset(base: DateTime<Utc>, at: DateTime<Utc>) -> u16 {
    u16::try_from((at - base).num_minutes()).unwrap_or(u16::MAX)
}
