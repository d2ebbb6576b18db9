use std::sync::Arc;

use kunai_app::app::api::routes;
use kunai_app::state::{AppState, StateHandler};
use kunai_core::config::load_config;
use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting kunai free/busy federation node");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_settings(config).await?);

    tracing::info!(
        providers = ?state.registry.providers().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        "Provider registry assembled"
    );

    let cancel = CancellationToken::new();
    let dispatchers = state.sync.spawn_dispatchers(&cancel);

    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(StateHandler {
            state: Arc::clone(&state),
        })
        .push(routes()?);

    tracing::info!("Server listening on {bind_addr}");

    let server = salvo::Server::new(acceptor);
    let handle = server.handle();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown requested");
        shutdown.cancel();
        handle.stop_graceful(None);
    });

    server.serve(router).await;

    cancel.cancel();
    for dispatcher in dispatchers {
        if let Err(e) = dispatcher.await {
            tracing::warn!(error = %e, "Sync dispatcher ended abnormally");
        }
    }
    tracing::info!("Shut down");

    Ok(())
}
