//! Provider and resolver table, assembled once at startup.

use std::sync::Arc;

use kunai_core::model::FreeBusyRequest;

use super::resolver::PrincipalResolver;
use super::{FreeBusyProvider, Route};

/// Providers plus the ordered resolvers that route principals to them.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn FreeBusyProvider>>,
    resolvers: Vec<Box<dyn PrincipalResolver>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn FreeBusyProvider>> {
        self.providers.iter()
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<Arc<dyn FreeBusyProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Providers that want local mailbox changes pushed to them.
    pub fn push_providers(&self) -> impl Iterator<Item = &Arc<dyn FreeBusyProvider>> {
        self.providers
            .iter()
            .filter(|p| p.registers_for_mailbox_changes())
    }

    /// First resolver claiming the request wins.
    #[must_use]
    pub fn resolve(&self, request: &FreeBusyRequest) -> Option<Route> {
        self.resolvers.iter().find_map(|r| r.resolve(request))
    }
}

/// Append-only builder for [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: Vec<Arc<dyn FreeBusyProvider>>,
    resolvers: Vec<Box<dyn PrincipalResolver>>,
}

impl ProviderRegistryBuilder {
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn FreeBusyProvider>) -> Self {
        tracing::debug!(provider = provider.name(), "Registering free/busy provider");
        self.providers.push(provider);
        self
    }

    /// Adds a resolver after those already registered.
    #[must_use]
    pub fn resolver(mut self, resolver: impl PrincipalResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<ProviderRegistry> {
        Arc::new(ProviderRegistry {
            providers: self.providers,
            resolvers: self.resolvers,
        })
    }
}
