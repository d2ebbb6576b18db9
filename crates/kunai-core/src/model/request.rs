use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};

/// One principal's availability question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBusyRequest {
    /// Address or account id the caller asked about; results are keyed by it.
    pub principal: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Appointment to leave out, e.g. the one being rescheduled.
    pub exclude_item: Option<String>,
    /// Account id filled in by a resolver when the principal maps to a known account.
    pub account_id: Option<String>,
}

impl FreeBusyRequest {
    /// ## Errors
    /// Returns `CoreError::InvalidInterval` if `end` precedes `start`.
    pub fn new(
        principal: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidInterval { start, end });
        }
        Ok(Self {
            principal: principal.into(),
            start,
            end,
            exclude_item: None,
            account_id: None,
        })
    }

    #[must_use]
    pub fn excluding(mut self, item_id: impl Into<String>) -> Self {
        self.exclude_item = Some(item_id.into());
        self
    }

    /// Account id if resolved, otherwise the principal as given.
    #[must_use]
    pub fn account_or_principal(&self) -> &str {
        self.account_id.as_deref().unwrap_or(&self.principal)
    }
}
