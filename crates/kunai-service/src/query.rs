//! Fan-out of free/busy requests over the registered providers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use kunai_core::model::{FreeBusy, FreeBusyRequest};

use crate::error::ServiceResult;
use crate::provider::{FreeBusyProvider, ProviderRegistry};

struct Batch {
    provider: Arc<dyn FreeBusyProvider>,
    host: String,
    requests: Vec<FreeBusyRequest>,
}

/// One availability query over any number of principals.
///
/// Every added principal appears in the result. Principals nobody claims,
/// and those whose provider failed, come back as NODATA.
pub struct FreeBusyQuery {
    registry: Arc<ProviderRegistry>,
    requests: Vec<FreeBusyRequest>,
    local_only: bool,
}

impl FreeBusyQuery {
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            requests: Vec::new(),
            local_only: false,
        }
    }

    /// Answer only from providers reading this node's mailboxes.
    ///
    /// Peer requests are answered this way so two nodes never forward to
    /// each other.
    #[must_use]
    pub fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }

    pub fn add(&mut self, request: FreeBusyRequest) -> &mut Self {
        self.requests.push(request);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Runs the query, one concurrent batch per provider and host.
    ///
    /// ## Errors
    /// Only contract violations surface here; provider failures degrade to
    /// NODATA for the affected batch.
    #[tracing::instrument(skip(self), fields(count = self.requests.len(), local_only = self.local_only))]
    pub async fn execute(self) -> ServiceResult<BTreeMap<String, FreeBusy>> {
        let mut results = BTreeMap::new();
        let mut batches: BTreeMap<(String, String), Batch> = BTreeMap::new();

        for mut request in self.requests {
            let route = self
                .registry
                .resolve(&request)
                .filter(|route| !self.local_only || route.provider.is_local());
            let Some(route) = route else {
                tracing::debug!(principal = %request.principal, "No provider for principal");
                results.insert(
                    request.principal.clone(),
                    FreeBusy::nodata(&request.principal, request.start, request.end)?,
                );
                continue;
            };
            request.account_id = route.account_id;
            batches
                .entry((route.provider.name().to_string(), route.host.clone()))
                .or_insert_with(|| Batch {
                    provider: route.provider,
                    host: route.host,
                    requests: Vec::new(),
                })
                .requests
                .push(request);
        }

        let outcomes = join_all(batches.into_values().map(|batch| async move {
            let mut query = batch.provider.new_query(&batch.host);
            query.submit(batch.requests.clone());
            let outcome = query.fetch_results().await;
            (batch, outcome)
        }))
        .await;

        for (batch, outcome) in outcomes {
            let mut fetched = match outcome {
                Ok(fetched) => fetched,
                Err(err) => {
                    tracing::warn!(
                        provider = batch.provider.name(),
                        host = %batch.host,
                        error = %err,
                        "Free/busy batch failed"
                    );
                    Vec::new()
                }
            };
            for request in batch.requests {
                let fb = match fetched
                    .iter()
                    .position(|fb| fb.principal().eq_ignore_ascii_case(&request.principal))
                {
                    Some(index) => fetched.swap_remove(index),
                    None => FreeBusy::nodata(&request.principal, request.start, request.end)?,
                };
                results.insert(request.principal, fb);
            }
        }
        Ok(results)
    }

    /// Working hours of a principal hosted on this node; NODATA for anyone
    /// else or when none are configured.
    ///
    /// ## Errors
    /// Returns `ServiceError::InvalidScheduleSpec` for a malformed stored
    /// schedule and `ServiceError::CoreError` for a reversed window.
    #[tracing::instrument(skip(self))]
    pub async fn working_hours(
        &self,
        principal: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ServiceResult<FreeBusy> {
        let mut request = FreeBusyRequest::new(principal, start, end)?;
        if let Some(route) = self.registry.resolve(&request)
            && route.provider.is_local()
        {
            request.account_id = route.account_id;
            if let Some(fb) = route.provider.working_hours(&request).await? {
                return Ok(fb);
            }
        }
        Ok(FreeBusy::nodata(principal, start, end)?)
    }
}
