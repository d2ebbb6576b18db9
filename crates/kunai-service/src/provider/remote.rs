//! Provider federating to other kunai nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kunai_core::constants::PEER_ROUTE_PATH;
use kunai_core::model::{FreeBusy, FreeBusyRequest};
use kunai_rfc::rfc::peer::{PeerPrincipal, PeerRequest, PeerResponse};

use super::{FreeBusyProvider, ProviderQuery, by_window};
use crate::error::{ServiceError, ServiceResult};

pub const REMOTE_PROVIDER_NAME: &str = "remote";

struct RemoteInner {
    client: reqwest::Client,
    /// Peer hostname to base URL.
    peers: BTreeMap<String, String>,
}

/// Asks the node hosting a principal over the peer protocol.
pub struct RemoteProvider {
    inner: Arc<RemoteInner>,
}

impl RemoteProvider {
    #[must_use]
    pub fn new(client: reqwest::Client, peers: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(RemoteInner { client, peers }),
        }
    }
}

#[async_trait]
impl FreeBusyProvider for RemoteProvider {
    fn name(&self) -> &str {
        REMOTE_PROVIDER_NAME
    }

    fn new_query(&self, host: &str) -> Box<dyn ProviderQuery> {
        Box::new(RemoteQuery {
            inner: Arc::clone(&self.inner),
            host: host.to_string(),
            requests: Vec::new(),
        })
    }
}

struct RemoteQuery {
    inner: Arc<RemoteInner>,
    host: String,
    requests: Vec<FreeBusyRequest>,
}

impl RemoteQuery {
    #[tracing::instrument(
        skip(self, requests),
        fields(provider = REMOTE_PROVIDER_NAME, host = %self.host, count = requests.len())
    )]
    async fn fetch_window(
        &self,
        base_url: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        requests: &[&FreeBusyRequest],
    ) -> ServiceResult<Vec<FreeBusy>> {
        let body = PeerRequest::new(
            start,
            end,
            requests
                .iter()
                .map(|r| PeerPrincipal {
                    name: r.principal.clone(),
                    exclude_uid: r.exclude_item.clone(),
                })
                .collect(),
        );
        let url = format!("{}{PEER_ROUTE_PATH}", base_url.trim_end_matches('/'));
        let response = self.inner.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::TransportFailure(format!(
                "peer {} answered {}",
                self.host,
                response.status()
            )));
        }
        let answer: PeerResponse = response.json().await?;
        answer
            .users
            .iter()
            .map(|user| -> ServiceResult<FreeBusy> { Ok(user.to_freebusy(start, end)?) })
            .collect()
    }
}

#[async_trait]
impl ProviderQuery for RemoteQuery {
    fn submit(&mut self, requests: Vec<FreeBusyRequest>) {
        self.requests.extend(requests);
    }

    async fn fetch_results(&mut self) -> ServiceResult<Vec<FreeBusy>> {
        let base_url = self
            .inner
            .peers
            .get(&self.host)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("peer {}", self.host)))?;

        let mut results = Vec::new();
        for ((start, end), batch) in &by_window(&self.requests) {
            results.extend(self.fetch_window(&base_url, *start, *end, batch).await?);
        }
        Ok(results)
    }
}
