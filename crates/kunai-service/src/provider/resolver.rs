//! Principal resolvers, tried in registration order.

use std::collections::BTreeSet;
use std::sync::Arc;

use kunai_core::model::FreeBusyRequest;

use super::{FreeBusyProvider, Route};
use crate::directory::{Directory, email_domain};

/// Maps a request to the provider owning its principal.
pub trait PrincipalResolver: Send + Sync {
    fn resolve(&self, request: &FreeBusyRequest) -> Option<Route>;
}

/// Principals hosted on this node.
pub struct LocalResolver {
    hostname: String,
    directory: Arc<dyn Directory>,
    provider: Arc<dyn FreeBusyProvider>,
}

impl LocalResolver {
    #[must_use]
    pub fn new(
        hostname: impl Into<String>,
        directory: Arc<dyn Directory>,
        provider: Arc<dyn FreeBusyProvider>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            directory,
            provider,
        }
    }
}

impl PrincipalResolver for LocalResolver {
    fn resolve(&self, request: &FreeBusyRequest) -> Option<Route> {
        let account = self
            .directory
            .account_by_principal(request.account_or_principal())?;
        (account.host == self.hostname).then(|| Route {
            provider: Arc::clone(&self.provider),
            host: account.host,
            account_id: Some(account.id),
        })
    }
}

/// Principals known to the directory but hosted on another node.
pub struct PeerResolver {
    hostname: String,
    directory: Arc<dyn Directory>,
    provider: Arc<dyn FreeBusyProvider>,
}

impl PeerResolver {
    #[must_use]
    pub fn new(
        hostname: impl Into<String>,
        directory: Arc<dyn Directory>,
        provider: Arc<dyn FreeBusyProvider>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            directory,
            provider,
        }
    }
}

impl PrincipalResolver for PeerResolver {
    fn resolve(&self, request: &FreeBusyRequest) -> Option<Route> {
        let account = self
            .directory
            .account_by_principal(request.account_or_principal())?;
        (account.host != self.hostname).then(|| Route {
            provider: Arc::clone(&self.provider),
            host: account.host,
            account_id: Some(account.id),
        })
    }
}

/// Principals whose mail domain belongs to a foreign system.
pub struct DomainResolver {
    domains: BTreeSet<String>,
    provider: Arc<dyn FreeBusyProvider>,
}

impl DomainResolver {
    #[must_use]
    pub fn new(domains: impl IntoIterator<Item = String>, provider: Arc<dyn FreeBusyProvider>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
            provider,
        }
    }
}

impl PrincipalResolver for DomainResolver {
    fn resolve(&self, request: &FreeBusyRequest) -> Option<Route> {
        let principal = request
            .principal
            .strip_prefix("mailto:")
            .unwrap_or(&request.principal);
        let domain = email_domain(principal)?;
        self.domains.contains(&domain).then(|| Route {
            provider: Arc::clone(&self.provider),
            host: self.provider.name().to_string(),
            account_id: None,
        })
    }
}
