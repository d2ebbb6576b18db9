use chrono::{DateTime, Utc};

use super::FbStatus;

/// Link from a free/busy interval back to the appointment instance that produced it.
///
/// Field order defines the ordering: start, end, item id, recurrence id, status.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FbInstance {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub item_id: String,
    /// Start of the original occurrence for recurring items.
    pub recurrence_id: Option<DateTime<Utc>>,
    pub status: FbStatus,
}

impl FbInstance {
    #[must_use]
    pub fn new(
        status: FbStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        item_id: impl Into<String>,
        recurrence_id: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            start,
            end,
            item_id: item_id.into(),
            recurrence_id,
            status,
        }
    }
}
