//! Free/busy providers.
//!
//! A provider answers availability queries for the principals it owns and,
//! optionally, receives pushes of local availability changes. Which
//! provider owns a principal is decided by the resolvers held in the
//! [`ProviderRegistry`].

pub mod exchange;
pub mod local;
pub mod registry;
pub mod remote;
pub mod resolver;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kunai_core::model::{FreeBusy, FreeBusyRequest};
use kunai_core::types::ItemTypeMask;

use crate::error::{ServiceError, ServiceResult};

pub use registry::{ProviderRegistry, ProviderRegistryBuilder};
pub use resolver::PrincipalResolver;

/// A backend that answers and/or receives free/busy.
#[async_trait]
pub trait FreeBusyProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Per-request query bound to one host of this provider.
    fn new_query(&self, host: &str) -> Box<dyn ProviderQuery>;

    /// True for providers reading this node's own mailboxes.
    fn is_local(&self) -> bool {
        false
    }

    /// Whether local mailbox changes should be queued for this provider.
    fn registers_for_mailbox_changes(&self) -> bool {
        false
    }

    fn registers_for_account(&self, _account_id: &str) -> bool {
        false
    }

    /// Item types whose changes trigger a push.
    fn accepted_item_types(&self) -> ItemTypeMask {
        ItemTypeMask::NONE
    }

    /// Window of local availability published on each push.
    fn cached_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now, now)
    }

    /// Publishes the current availability of `account_id`.
    ///
    /// ## Errors
    /// Returns an error when delivery failed; the caller retries later.
    async fn handle_mailbox_change(&self, account_id: &str) -> ServiceResult<()> {
        Err(ServiceError::ProviderError {
            provider: self.name().to_string(),
            message: format!("cannot receive changes for {account_id}"),
        })
    }

    /// Working hours of a principal, if this provider knows them.
    ///
    /// ## Errors
    /// Returns an error if the stored schedule is invalid.
    async fn working_hours(&self, _request: &FreeBusyRequest) -> ServiceResult<Option<FreeBusy>> {
        Ok(None)
    }
}

/// One batch of requests against one provider host.
#[async_trait]
pub trait ProviderQuery: Send {
    fn submit(&mut self, requests: Vec<FreeBusyRequest>);

    /// Runs the submitted requests. Principals missing from the result are
    /// reported as NODATA by the caller.
    ///
    /// ## Errors
    /// Returns an error if the batch as a whole failed.
    async fn fetch_results(&mut self) -> ServiceResult<Vec<FreeBusy>>;
}

/// Where a principal's availability lives.
#[derive(Clone)]
pub struct Route {
    pub provider: Arc<dyn FreeBusyProvider>,
    pub host: String,
    /// Account id when the directory knows the principal.
    pub account_id: Option<String>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("provider", &self.provider.name())
            .field("host", &self.host)
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Rebuilds `fb` over another window, keeping only non-FREE intervals.
///
/// ## Errors
/// Returns `ServiceError::CoreError` for a reversed window.
pub fn rewindow(fb: &FreeBusy, start: DateTime<Utc>, end: DateTime<Utc>) -> ServiceResult<FreeBusy> {
    if fb.start() == start && fb.end() == end {
        return Ok(fb.clone());
    }
    let mut out = FreeBusy::new(fb.principal(), start, end)?;
    for interval in fb.intervals() {
        if interval.status != kunai_core::model::FbStatus::Free {
            out.add_interval(interval.clone())?;
        }
    }
    Ok(out)
}

/// Requests grouped by their window, so each window is asked for once.
pub(crate) fn by_window(
    requests: &[FreeBusyRequest],
) -> BTreeMap<(DateTime<Utc>, DateTime<Utc>), Vec<&FreeBusyRequest>> {
    let mut windows: BTreeMap<_, Vec<&FreeBusyRequest>> = BTreeMap::new();
    for request in requests {
        windows
            .entry((request.start, request.end))
            .or_default()
            .push(request);
    }
    windows
}
