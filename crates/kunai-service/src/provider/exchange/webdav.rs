//! Exchange over the public-folder WebDAV interface.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kunai_core::constants::EXCHANGE_FB_INTERVAL_MINUTES;
use kunai_core::model::{FreeBusy, FreeBusyRequest};
use kunai_core::types::{ItemTypeMask, ProviderServerInfo};
use kunai_rfc::rfc::dav::{build_proppatch, freebusy_query_url, parse_freebusy_response, proppatch_url};
use kunai_rfc::rfc::mapi::FreeBusyPublication;
use kunai_rfc::rfc::merged::decode_merged;
use reqwest::Method;

use super::{ExchangeContext, ExchangeHttp, mailbox_address, publish_window, slot_window};
use crate::error::{ServiceError, ServiceResult};
use crate::provider::{FreeBusyProvider, ProviderQuery, by_window, rewindow};

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

struct WebDavInner {
    name: String,
    http: ExchangeHttp,
    context: ExchangeContext,
}

/// Reads and publishes free/busy through `?cmd=freebusy` and PROPPATCH.
pub struct ExchangeWebDavProvider {
    inner: Arc<WebDavInner>,
}

impl ExchangeWebDavProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, http: ExchangeHttp, context: ExchangeContext) -> Self {
        Self {
            inner: Arc::new(WebDavInner {
                name: name.into(),
                http,
                context,
            }),
        }
    }

    #[tracing::instrument(skip(self), fields(provider = %self.inner.name))]
    async fn publish(&self, account_id: &str) -> ServiceResult<()> {
        let now = Utc::now();
        let (account, info, fb) = self
            .inner
            .context
            .publication_source(&self.inner.name, account_id, self.cached_window(now))
            .await?;

        let publication = FreeBusyPublication::from_freebusy(&fb, now);
        let body = build_proppatch(&publication.properties(Some(&account.email)))?;
        let url = proppatch_url(&info.url, &info.org, &info.cn)?;
        let method = Method::from_bytes(b"PROPPATCH")
            .map_err(|err| ServiceError::TransportFailure(err.to_string()))?;
        self.inner
            .http
            .send(&info, method, url, XML_CONTENT_TYPE, Some(body))
            .await?;
        tracing::info!(account = %account.id, cn = %info.cn, "Published free/busy");
        Ok(())
    }
}

#[async_trait]
impl FreeBusyProvider for ExchangeWebDavProvider {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn new_query(&self, host: &str) -> Box<dyn ProviderQuery> {
        Box::new(WebDavQuery {
            inner: Arc::clone(&self.inner),
            host: host.to_string(),
            requests: Vec::new(),
        })
    }

    fn registers_for_mailbox_changes(&self) -> bool {
        true
    }

    fn registers_for_account(&self, account_id: &str) -> bool {
        self.inner
            .context
            .registers_for_account(&self.inner.name, account_id)
    }

    fn accepted_item_types(&self) -> ItemTypeMask {
        ItemTypeMask::APPOINTMENT
    }

    fn cached_window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        publish_window(now)
    }

    async fn handle_mailbox_change(&self, account_id: &str) -> ServiceResult<()> {
        self.publish(account_id).await
    }
}

struct WebDavQuery {
    inner: Arc<WebDavInner>,
    host: String,
    requests: Vec<FreeBusyRequest>,
}

impl WebDavQuery {
    #[tracing::instrument(
        skip(self, info, requests),
        fields(provider = %self.inner.name, host = %self.host, count = requests.len())
    )]
    async fn fetch_window(
        &self,
        info: &ProviderServerInfo,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        requests: &[&FreeBusyRequest],
    ) -> ServiceResult<Vec<FreeBusy>> {
        let (slot_start, slot_end) = slot_window(start, end);
        let addresses: Vec<&str> = requests
            .iter()
            .map(|r| mailbox_address(&r.principal))
            .collect();
        let url = freebusy_query_url(
            &info.url,
            slot_start,
            slot_end,
            EXCHANGE_FB_INTERVAL_MINUTES,
            &addresses,
        )?;
        let body = self
            .inner
            .http
            .send(info, Method::GET, url, XML_CONTENT_TYPE, None)
            .await?;
        let recipients = parse_freebusy_response(body.as_bytes())?;

        let mut results = Vec::with_capacity(requests.len());
        for (request, address) in requests.iter().zip(&addresses) {
            let Some(recipient) = recipients
                .iter()
                .find(|r| r.email.eq_ignore_ascii_case(address))
            else {
                tracing::debug!(principal = %request.principal, "Recipient missing from response");
                continue;
            };
            let fb = decode_merged(
                &request.principal,
                slot_start,
                slot_end,
                EXCHANGE_FB_INTERVAL_MINUTES,
                &recipient.fbdata,
            )?;
            results.push(rewindow(&fb, start, end)?);
        }
        Ok(results)
    }
}

#[async_trait]
impl ProviderQuery for WebDavQuery {
    fn submit(&mut self, requests: Vec<FreeBusyRequest>) {
        self.requests.extend(requests);
    }

    async fn fetch_results(&mut self) -> ServiceResult<Vec<FreeBusy>> {
        let info = self.inner.context.query_server(&self.inner.name)?;

        let mut results = Vec::new();
        for ((start, end), batch) in &by_window(&self.requests) {
            results.extend(self.fetch_window(&info, *start, *end, batch).await?);
        }
        Ok(results)
    }
}
