//! Assembles the provider registry from configuration.
//!
//! Resolution order: mailboxes hosted on this node, then mailboxes of peer
//! nodes, then each Exchange integration by mail domain.

use std::collections::BTreeMap;
use std::sync::Arc;

use kunai_core::config::{ExchangeConfig, ExchangeProtocol, Settings};
use kunai_core::types::ProviderServerInfo;
use kunai_service::directory::{ConfiguredServerInfo, Directory, ServerInfoLookup};
use kunai_service::error::ServiceError;
use kunai_service::provider::exchange::{
    ExchangeContext, ExchangeEwsProvider, ExchangeHttp, ExchangeWebDavProvider,
};
use kunai_service::provider::local::{CalendarStore, LocalProvider};
use kunai_service::provider::remote::RemoteProvider;
use kunai_service::provider::resolver::{DomainResolver, LocalResolver, PeerResolver};
use kunai_service::provider::{FreeBusyProvider, ProviderRegistry};

use crate::error::AppResult;

fn server_info(config: &ExchangeConfig) -> ProviderServerInfo {
    ProviderServerInfo {
        url: config.url.trim_end_matches('/').to_string(),
        username: config.username.clone(),
        password: config.password.clone(),
        auth_scheme: config.auth_scheme,
        org: config.org.clone(),
        cn: String::new(),
    }
}

/// Server settings of every configured Exchange integration, keyed by name.
#[must_use]
pub fn server_lookup(settings: &Settings) -> Arc<dyn ServerInfoLookup> {
    settings
        .exchange
        .iter()
        .fold(ConfiguredServerInfo::new(), |lookup, exchange| {
            lookup.with_server(exchange.name.clone(), server_info(exchange))
        })
        .into_shared()
}

/// ## Summary
/// Builds the provider registry for this node.
///
/// ## Errors
/// Returns an error if an HTTP client cannot be constructed.
pub fn build_registry(
    settings: &Settings,
    directory: Arc<dyn Directory>,
    store: Arc<dyn CalendarStore>,
) -> AppResult<Arc<ProviderRegistry>> {
    let hostname = settings.node.hostname.clone();

    let local: Arc<dyn FreeBusyProvider> = Arc::new(LocalProvider::new(
        Arc::clone(&directory),
        Arc::clone(&store),
    ));

    let peers: BTreeMap<String, String> = settings
        .peers
        .iter()
        .map(|peer| (peer.hostname.clone(), peer.url.clone()))
        .collect();
    let client = reqwest::Client::builder()
        .build()
        .map_err(ServiceError::from)?;
    let remote: Arc<dyn FreeBusyProvider> = Arc::new(RemoteProvider::new(client, peers));

    let mut builder = ProviderRegistry::builder()
        .provider(Arc::clone(&local))
        .provider(Arc::clone(&remote))
        .resolver(LocalResolver::new(
            hostname.clone(),
            Arc::clone(&directory),
            local,
        ))
        .resolver(PeerResolver::new(
            hostname.clone(),
            Arc::clone(&directory),
            remote,
        ));

    let servers = server_lookup(settings);
    for exchange in &settings.exchange {
        let context = ExchangeContext {
            hostname: hostname.clone(),
            directory: Arc::clone(&directory),
            store: Arc::clone(&store),
            servers: Arc::clone(&servers),
        };
        let http = ExchangeHttp::new()?;
        let provider: Arc<dyn FreeBusyProvider> = match exchange.protocol {
            ExchangeProtocol::Webdav => Arc::new(ExchangeWebDavProvider::new(
                exchange.name.clone(),
                http,
                context,
            )),
            ExchangeProtocol::Ews => Arc::new(ExchangeEwsProvider::new(
                exchange.name.clone(),
                http,
                context,
            )),
        };
        tracing::info!(
            provider = %exchange.name,
            protocol = ?exchange.protocol,
            url = %exchange.url,
            domains = ?exchange.domains,
            "Exchange integration configured"
        );
        builder = builder
            .provider(Arc::clone(&provider))
            .resolver(DomainResolver::new(exchange.domains.iter().cloned(), provider));
    }

    Ok(builder.build())
}
