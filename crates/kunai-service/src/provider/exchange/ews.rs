//! Exchange over Exchange Web Services.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kunai_core::constants::EXCHANGE_FB_INTERVAL_MINUTES;
use kunai_core::model::{FreeBusy, FreeBusyRequest};
use kunai_core::types::{ItemTypeMask, ProviderServerInfo};
use kunai_rfc::rfc::ews::{
    FolderEntry, FolderRef, ItemEntry, MailboxAvailability, create_item, find_folder, find_item,
    get_user_availability, match_by_name, parse_availability, parse_create_item,
    parse_find_folder, parse_find_item, parse_update_item, update_item,
};
use kunai_rfc::rfc::mapi::FreeBusyPublication;
use kunai_rfc::rfc::merged::decode_merged;
use reqwest::Method;
use url::Url;

use super::{ExchangeContext, ExchangeHttp, mailbox_address, publish_window, slot_window};
use crate::error::{ServiceError, ServiceResult};
use crate::provider::{FreeBusyProvider, ProviderQuery, by_window, rewindow};

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";
const EWS_PATH: &str = "/EWS/Exchange.asmx";
const SCHEDULE_FOLDER: &str = "SCHEDULE+ FREE BUSY";
const NON_IPM_SUBTREE: &str = "NON_IPM_SUBTREE";

/// The service endpoint; a configured URL may already point at it.
fn endpoint(server: &str) -> ServiceResult<Url> {
    let server = server.trim_end_matches('/');
    let url = if server.to_ascii_lowercase().ends_with(".asmx") {
        server.to_string()
    } else {
        format!("{server}{EWS_PATH}")
    };
    Ok(Url::parse(&url).map_err(kunai_rfc::error::RfcError::from)?)
}

struct EwsInner {
    name: String,
    http: ExchangeHttp,
    context: ExchangeContext,
}

impl EwsInner {
    async fn call(&self, info: &ProviderServerInfo, envelope: String) -> ServiceResult<String> {
        self.http
            .send(
                info,
                Method::POST,
                endpoint(&info.url)?,
                SOAP_CONTENT_TYPE,
                Some(envelope),
            )
            .await
    }

    async fn child_folders(
        &self,
        info: &ProviderServerInfo,
        parent: &FolderRef,
    ) -> ServiceResult<Vec<FolderEntry>> {
        let answer = self.call(info, find_folder(parent)?).await?;
        Ok(parse_find_folder(answer.as_bytes())?)
    }

    /// `SCHEDULE+ FREE BUSY`, directly below the public root or below
    /// its `NON_IPM_SUBTREE`.
    async fn schedule_folder(&self, info: &ProviderServerInfo) -> ServiceResult<FolderEntry> {
        let roots = self
            .child_folders(info, &FolderRef::PublicFoldersRoot)
            .await?;
        if let Some(found) = match_by_name(&roots, SCHEDULE_FOLDER, |f| f.display_name.as_str()) {
            return Ok(found.clone());
        }
        let subtree = roots
            .iter()
            .find(|f| f.display_name.eq_ignore_ascii_case(NON_IPM_SUBTREE))
            .ok_or_else(|| ServiceError::NotFound(SCHEDULE_FOLDER.to_string()))?;
        let folders = self
            .child_folders(info, &FolderRef::Id(subtree.id.clone()))
            .await?;
        match_by_name(&folders, SCHEDULE_FOLDER, |f| f.display_name.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(SCHEDULE_FOLDER.to_string()))
    }

    /// The hidden free/busy message of `info.cn`, created when absent.
    #[tracing::instrument(skip(self, info), fields(provider = %self.name, cn = %info.cn))]
    async fn freebusy_message(&self, info: &ProviderServerInfo) -> ServiceResult<ItemEntry> {
        let schedule = self.schedule_folder(info).await?;
        let org_folders = self
            .child_folders(info, &FolderRef::Id(schedule.id))
            .await?;
        let wanted = format!("EX:{}", info.org);
        let folder = match_by_name(&org_folders, &wanted, |f| f.display_name.as_str())
            .ok_or_else(|| ServiceError::NotFound(wanted.clone()))?;

        let answer = self.call(info, find_item(&folder.id)?).await?;
        let items = parse_find_item(answer.as_bytes())?;
        let subject = format!("USER-/CN=RECIPIENTS/CN={}", info.cn);
        if let Some(item) = match_by_name(&items, &subject, |i| i.subject.as_str()) {
            return Ok(item.clone());
        }

        tracing::info!(%subject, "Creating free/busy message");
        let answer = self
            .call(info, create_item(&folder.id, &subject)?)
            .await?;
        Ok(parse_create_item(answer.as_bytes())?)
    }
}

/// Reads availability with `GetUserAvailability` and publishes by
/// updating the per-user free/busy message.
pub struct ExchangeEwsProvider {
    inner: Arc<EwsInner>,
}

impl ExchangeEwsProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, http: ExchangeHttp, context: ExchangeContext) -> Self {
        Self {
            inner: Arc::new(EwsInner {
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

        let item = self.inner.freebusy_message(&info).await?;
        let publication = FreeBusyPublication::from_freebusy(&fb, now);
        let envelope = update_item(
            &item.id,
            item.change_key.as_deref(),
            &publication.properties(Some(&account.email)),
        )?;
        let answer = self.inner.call(&info, envelope).await?;
        parse_update_item(answer.as_bytes())?;
        tracing::info!(account = %account.id, item = %item.id, "Published free/busy");
        Ok(())
    }
}

#[async_trait]
impl FreeBusyProvider for ExchangeEwsProvider {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn new_query(&self, host: &str) -> Box<dyn ProviderQuery> {
        Box::new(EwsQuery {
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

struct EwsQuery {
    inner: Arc<EwsInner>,
    host: String,
    requests: Vec<FreeBusyRequest>,
}

impl EwsQuery {
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
        let mailboxes: Vec<&str> = requests
            .iter()
            .map(|r| mailbox_address(&r.principal))
            .collect();
        let envelope =
            get_user_availability(&mailboxes, slot_start, slot_end, EXCHANGE_FB_INTERVAL_MINUTES)?;
        let answer = self.inner.call(info, envelope).await?;
        let availability = parse_availability(answer.as_bytes())?;
        // Responses carry no address and are matched to mailboxes by position.
        if availability.len() != requests.len() {
            tracing::warn!(
                expected = requests.len(),
                received = availability.len(),
                "Availability response does not match the request"
            );
            return Err(ServiceError::TransportFailure(format!(
                "{} availability responses for {} mailboxes",
                availability.len(),
                requests.len()
            )));
        }

        let mut results = Vec::with_capacity(requests.len());
        for (request, mailbox) in requests.iter().zip(availability) {
            match mailbox {
                MailboxAvailability::Merged(digits) => {
                    let fb = decode_merged(
                        &request.principal,
                        slot_start,
                        slot_end,
                        EXCHANGE_FB_INTERVAL_MINUTES,
                        &digits,
                    )?;
                    results.push(rewindow(&fb, start, end)?);
                }
                MailboxAvailability::Error { code, message } => {
                    tracing::debug!(principal = %request.principal, %code, %message, "Mailbox unavailable");
                }
            }
        }
        Ok(results)
    }
}

#[async_trait]
impl ProviderQuery for EwsQuery {
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
