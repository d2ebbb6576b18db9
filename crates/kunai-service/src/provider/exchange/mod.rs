//! Providers for Microsoft Exchange.
//!
//! Both protocol variants share the same shape: queries are answered from
//! the merged status string Exchange returns at a fixed slot width, and
//! pushes publish the MAPI month bitmaps of a local account computed over
//! [`publish_window`].

mod ews;
mod http;
mod webdav;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use kunai_core::constants::EXCHANGE_FB_INTERVAL_MINUTES;
use kunai_core::model::FreeBusy;
use kunai_core::types::ProviderServerInfo;
use kunai_rfc::rfc::mapi::{month_start, next_month_start};

use super::local::{CalendarStore, local_freebusy};
use crate::directory::{Account, Directory, ServerInfoLookup};
use crate::error::{ServiceError, ServiceResult};

pub use ews::ExchangeEwsProvider;
pub use http::ExchangeHttp;
pub use webdav::ExchangeWebDavProvider;

/// Months published on every push, counting the current one.
pub const EXCHANGE_PUBLISH_MONTHS: u32 = 2;

/// Window published for a push at `now`.
#[must_use]
pub fn publish_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = month_start(now);
    let end = (0..EXCHANGE_PUBLISH_MONTHS).fold(start, |cursor, _| next_month_start(cursor));
    (start, end)
}

/// Widens `[start, end)` outwards to whole slots of the Exchange interval.
#[must_use]
pub fn slot_window(start: DateTime<Utc>, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let slot = Duration::minutes(i64::from(EXCHANGE_FB_INTERVAL_MINUTES));
    let floor = |dt: DateTime<Utc>| {
        let into_slot = dt.timestamp().rem_euclid(slot.num_seconds());
        dt - Duration::seconds(into_slot)
            - Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos()))
    };
    let start = floor(start);
    let floored_end = floor(end);
    let end = if floored_end < end {
        floored_end + slot
    } else {
        floored_end
    };
    (start, end)
}

/// Strips a `mailto:` scheme so the address can be compared with what
/// Exchange echoes back.
#[must_use]
pub fn mailbox_address(principal: &str) -> &str {
    match principal.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => &principal[7..],
        _ => principal,
    }
}

/// What an Exchange provider needs to know about this node.
#[derive(Clone)]
pub struct ExchangeContext {
    /// Hostname of this node; only accounts hosted here are published.
    pub hostname: String,
    pub directory: Arc<dyn Directory>,
    pub store: Arc<dyn CalendarStore>,
    pub servers: Arc<dyn ServerInfoLookup>,
}

impl ExchangeContext {
    fn local_account(&self, provider: &str, account_id: &str) -> Option<(Account, ProviderServerInfo)> {
        let account = self.directory.account_by_id(account_id)?;
        if account.host != self.hostname {
            return None;
        }
        let info = self.servers.server_info(provider, Some(&account))?;
        Some((account, info))
    }

    fn registers_for_account(&self, provider: &str, account_id: &str) -> bool {
        self.local_account(provider, account_id).is_some()
    }

    /// Server settings for queries, which are not tied to any account.
    fn query_server(&self, provider: &str) -> ServiceResult<ProviderServerInfo> {
        self.servers
            .server_info(provider, None)
            .ok_or_else(|| ServiceError::InvalidConfiguration(format!("no server for {provider}")))
    }

    /// Account, its server settings and its current availability over `window`.
    async fn publication_source(
        &self,
        provider: &str,
        account_id: &str,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> ServiceResult<(Account, ProviderServerInfo, FreeBusy)> {
        let (account, info) = self
            .local_account(provider, account_id)
            .ok_or_else(|| ServiceError::NotFound(format!("local account {account_id}")))?;
        let fb = local_freebusy(
            self.store.as_ref(),
            &account,
            &account.email,
            window.0,
            window.1,
            None,
        )
        .await?;
        Ok((account, info, fb))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn publish_window_covers_two_months() {
        let now = Utc.with_ymd_and_hms(2024, 12, 20, 13, 45, 0).unwrap();
        let (start, end) = publish_window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn slot_window_rounds_outwards() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 10, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 4, 11, 30, 0).unwrap();
        let (s, e) = slot_window(start, end);
        assert_eq!(s, Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap());
        assert_eq!(e, end);

        let ragged = Utc.with_ymd_and_hms(2024, 3, 4, 11, 31, 0).unwrap();
        assert_eq!(
            slot_window(start, ragged).1,
            Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn mailto_is_stripped() {
        assert_eq!(mailbox_address("MAILTO:a@example.com"), "a@example.com");
        assert_eq!(mailbox_address("a@example.com"), "a@example.com");
        assert_eq!(mailbox_address("ab"), "ab");
    }
}
