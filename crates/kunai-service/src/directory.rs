//! Directory collaborators: who an account is, which node hosts it, and how
//! to reach its foreign free/busy server.

use std::collections::BTreeMap;
use std::sync::Arc;

use kunai_core::config::{AccountConfig, DirectoryConfig};
use kunai_core::types::ProviderServerInfo;

/// A mailbox known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub email: String,
    /// Node hosting the mailbox.
    pub host: String,
    /// IANA time zone for working hours.
    pub timezone: Option<String>,
    pub working_hours: Option<String>,
    /// Recipient CN on Exchange.
    pub exchange_cn: Option<String>,
}

impl Account {
    /// Recipient CN, defaulting to the local part of the address.
    #[must_use]
    pub fn recipient_cn(&self) -> &str {
        self.exchange_cn
            .as_deref()
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(&self.email))
    }

    /// Lowercased domain of the address.
    #[must_use]
    pub fn domain(&self) -> Option<String> {
        email_domain(&self.email)
    }
}

impl From<&AccountConfig> for Account {
    fn from(config: &AccountConfig) -> Self {
        Self {
            id: config.id.clone(),
            email: config.email.clone(),
            host: config.host.clone(),
            timezone: config.timezone.clone(),
            working_hours: config.working_hours.clone(),
            exchange_cn: config.exchange_cn.clone(),
        }
    }
}

/// Lowercased domain of an e-mail address.
#[must_use]
pub fn email_domain(address: &str) -> Option<String> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
}

/// Account lookup.
pub trait Directory: Send + Sync {
    /// Finds an account by e-mail address (case-insensitive) or account id.
    fn account_by_principal(&self, principal: &str) -> Option<Account>;

    fn account_by_id(&self, id: &str) -> Option<Account>;
}

/// Directory backed by a fixed account list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    accounts: Vec<Account>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    #[must_use]
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self::new(config.accounts.iter().map(Account::from).collect())
    }
}

impl Directory for StaticDirectory {
    fn account_by_principal(&self, principal: &str) -> Option<Account> {
        let principal = principal.strip_prefix("mailto:").unwrap_or(principal);
        self.accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(principal) || a.id == principal)
            .cloned()
    }

    fn account_by_id(&self, id: &str) -> Option<Account> {
        self.accounts.iter().find(|a| a.id == id).cloned()
    }
}

/// Connection details of a foreign free/busy server.
pub trait ServerInfoLookup: Send + Sync {
    /// Server settings for `provider`; with an account, its recipient CN is filled in.
    fn server_info(&self, provider: &str, account: Option<&Account>) -> Option<ProviderServerInfo>;
}

/// Per-provider server settings with the account's recipient CN filled in.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredServerInfo {
    servers: BTreeMap<String, ProviderServerInfo>,
}

impl ConfiguredServerInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_server(mut self, provider: impl Into<String>, info: ProviderServerInfo) -> Self {
        self.servers.insert(provider.into(), info);
        self
    }

    #[must_use]
    pub fn into_shared(self) -> Arc<dyn ServerInfoLookup> {
        Arc::new(self)
    }
}

impl ServerInfoLookup for ConfiguredServerInfo {
    fn server_info(&self, provider: &str, account: Option<&Account>) -> Option<ProviderServerInfo> {
        let mut info = self.servers.get(provider)?.clone();
        if let Some(account) = account {
            info.cn = account.recipient_cn().to_string();
        }
        Some(info)
    }
}
