//! Provider for mailboxes hosted on this node.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use kunai_core::model::{FbInstance, FreeBusy, FreeBusyRequest};

use super::{FreeBusyProvider, ProviderQuery};
use crate::directory::{Account, Directory};
use crate::error::{ServiceError, ServiceResult};
use crate::working_hours::WorkingHours;

pub const LOCAL_PROVIDER_NAME: &str = "local";

/// Scheduling preferences stored with a mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub working_hours: Option<String>,
    pub timezone: Option<String>,
}

/// Read access to the already-expanded appointments of local mailboxes.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Appointment instances of `account` overlapping `[start, end)`.
    ///
    /// ## Errors
    /// Returns `ServiceError::PermissionDenied` when the mailbox does not
    /// share its availability, other errors when the store is unreadable.
    async fn instances(
        &self,
        account: &Account,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ServiceResult<Vec<FbInstance>>;

    /// ## Errors
    /// Returns an error when the store is unreadable.
    async fn preferences(&self, account: &Account) -> ServiceResult<Preferences> {
        Ok(Preferences {
            working_hours: account.working_hours.clone(),
            timezone: account.timezone.clone(),
        })
    }
}

/// Computes the free/busy of a local account, honouring exclusions and
/// mapping a permission denial to NODATA.
///
/// ## Errors
/// Returns store errors other than `PermissionDenied`.
pub async fn local_freebusy(
    store: &dyn CalendarStore,
    account: &Account,
    principal: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_item: Option<&str>,
) -> ServiceResult<FreeBusy> {
    match store.instances(account, start, end).await {
        Ok(instances) => Ok(FreeBusy::from_instances(
            principal,
            start,
            end,
            instances
                .into_iter()
                .filter(|i| exclude_item != Some(i.item_id.as_str())),
        )?),
        Err(ServiceError::PermissionDenied(reason)) => {
            tracing::debug!(account = %account.id, %reason, "Free/busy not shared");
            Ok(FreeBusy::nodata(principal, start, end)?)
        }
        Err(err) => Err(err),
    }
}

struct LocalInner {
    directory: Arc<dyn Directory>,
    store: Arc<dyn CalendarStore>,
}

/// Reads the node's own calendar store.
pub struct LocalProvider {
    inner: Arc<LocalInner>,
}

impl LocalProvider {
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>, store: Arc<dyn CalendarStore>) -> Self {
        Self {
            inner: Arc::new(LocalInner { directory, store }),
        }
    }
}

#[async_trait]
impl FreeBusyProvider for LocalProvider {
    fn name(&self) -> &str {
        LOCAL_PROVIDER_NAME
    }

    fn new_query(&self, _host: &str) -> Box<dyn ProviderQuery> {
        Box::new(LocalQuery {
            inner: Arc::clone(&self.inner),
            requests: Vec::new(),
        })
    }

    fn is_local(&self) -> bool {
        true
    }

    #[tracing::instrument(skip(self, request), fields(principal = %request.principal))]
    async fn working_hours(&self, request: &FreeBusyRequest) -> ServiceResult<Option<FreeBusy>> {
        let Some(account) = self
            .inner
            .directory
            .account_by_principal(request.account_or_principal())
        else {
            return Ok(None);
        };
        let prefs = self.inner.store.preferences(&account).await?;
        let Some(schedule) = prefs.working_hours else {
            tracing::debug!(account = %account.id, "No working hours configured");
            return Ok(None);
        };
        let tz = match prefs.timezone.as_deref() {
            Some(name) => Tz::from_str(name).map_err(|err| {
                ServiceError::InvalidConfiguration(format!("time zone {name}: {err}"))
            })?,
            None => Tz::UTC,
        };
        let hours: WorkingHours = schedule.parse()?;
        Ok(Some(hours.free_busy(
            &request.principal,
            request.start,
            request.end,
            tz,
        )?))
    }
}

struct LocalQuery {
    inner: Arc<LocalInner>,
    requests: Vec<FreeBusyRequest>,
}

#[async_trait]
impl ProviderQuery for LocalQuery {
    fn submit(&mut self, requests: Vec<FreeBusyRequest>) {
        self.requests.extend(requests);
    }

    #[tracing::instrument(skip(self), fields(provider = LOCAL_PROVIDER_NAME))]
    async fn fetch_results(&mut self) -> ServiceResult<Vec<FreeBusy>> {
        let mut results = Vec::with_capacity(self.requests.len());
        for request in self.requests.drain(..) {
            let Some(account) = self
                .inner
                .directory
                .account_by_principal(request.account_or_principal())
            else {
                tracing::debug!(principal = %request.principal, "Unknown local principal");
                continue;
            };
            results.push(
                local_freebusy(
                    self.inner.store.as_ref(),
                    &account,
                    &request.principal,
                    request.start,
                    request.end,
                    request.exclude_item.as_deref(),
                )
                .await?,
            );
        }
        Ok(results)
    }
}
