//! JSON protocol between kunai nodes.
//!
//! A node asks a peer for the free/busy of principals hosted there; the
//! peer answers from its local providers only.

use chrono::{DateTime, Utc};
use kunai_core::model::{FbStatus, FreeBusy, FreeBusySink, Interval};
use serde::{Deserialize, Serialize};

use crate::error::{RfcError, RfcResult};

fn from_millis(ms: i64) -> RfcResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| RfcError::InvalidValue(format!("timestamp {ms} out of range")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerPrincipal {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRequest {
    pub start_ms: i64,
    pub end_ms: i64,
    pub principals: Vec<PeerPrincipal>,
}

impl PeerRequest {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, principals: Vec<PeerPrincipal>) -> Self {
        Self {
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
            principals,
        }
    }

    /// ## Errors
    /// Returns `RfcError::InvalidValue` for unrepresentable timestamps.
    pub fn window(&self) -> RfcResult<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((from_millis(self.start_ms)?, from_millis(self.end_ms)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInterval {
    /// One of `F`, `T`, `B`, `O`, `N`.
    pub status: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerUser {
    pub id: String,
    pub intervals: Vec<PeerInterval>,
}

impl PeerUser {
    /// Rebuilds the user's free/busy over the requested window.
    ///
    /// ## Errors
    /// Returns `RfcError::InvalidValue` for an unknown status code or bad
    /// timestamp, and `RfcError::CoreError` for reversed intervals.
    pub fn to_freebusy(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> RfcResult<FreeBusy> {
        let mut fb = FreeBusy::new(self.id.clone(), start, end)?;
        for interval in &self.intervals {
            let status = interval
                .status
                .chars()
                .next()
                .and_then(FbStatus::from_code)
                .ok_or_else(|| {
                    RfcError::InvalidValue(format!("status code {:?}", interval.status))
                })?;
            if status == FbStatus::Free {
                continue;
            }
            fb.add_interval(Interval::new(
                from_millis(interval.start_ms)?,
                from_millis(interval.end_ms)?,
                status,
            )?)?;
        }
        Ok(fb)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerResponse {
    pub users: Vec<PeerUser>,
}

impl FreeBusySink for PeerResponse {
    fn begin(&mut self, principal: &str, _start: DateTime<Utc>, _end: DateTime<Utc>) {
        self.users.push(PeerUser {
            id: principal.to_string(),
            intervals: Vec::new(),
        });
    }

    fn interval(&mut self, status: FbStatus, start: DateTime<Utc>, end: DateTime<Utc>) {
        if let Some(user) = self.users.last_mut() {
            user.intervals.push(PeerInterval {
                status: status.code().to_string(),
                start_ms: start.timestamp_millis(),
                end_ms: end.timestamp_millis(),
            });
        }
    }
}
