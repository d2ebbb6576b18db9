use std::sync::Arc;

use kunai_core::config::Settings;
use kunai_service::directory::{Directory, StaticDirectory};
use kunai_service::provider::ProviderRegistry;
use kunai_service::provider::local::CalendarStore;
use kunai_service::sync::SyncManager;
use salvo::async_trait;

use crate::error::{AppError, AppResult};
use crate::registry::build_registry;
use crate::store::JsonCalendarStore;

/// Everything a request handler needs, shared for the process lifetime.
pub struct AppState {
    pub settings: Settings,
    pub registry: Arc<ProviderRegistry>,
    pub sync: SyncManager,
}

impl AppState {
    /// ## Summary
    /// Wires up the directory, calendar store, providers, and sync queues
    /// described by `settings`.
    ///
    /// ## Errors
    /// Returns an error if a provider cannot be built or a sync queue
    /// cannot be opened.
    pub async fn from_settings(settings: Settings) -> AppResult<Self> {
        let directory: Arc<dyn Directory> =
            Arc::new(StaticDirectory::from_config(&settings.directory));
        let store: Arc<dyn CalendarStore> = Arc::new(JsonCalendarStore::new(&settings.store.dir));
        let registry = build_registry(&settings, directory, store)?;
        Self::with_registry(settings, registry).await
    }

    /// ## Errors
    /// Returns an error if a sync queue cannot be opened.
    pub async fn with_registry(
        settings: Settings,
        registry: Arc<ProviderRegistry>,
    ) -> AppResult<Self> {
        let sync = SyncManager::open(Arc::clone(&registry), &settings.sync).await?;
        Ok(Self {
            settings,
            registry,
            sync,
        })
    }
}

pub struct StateHandler {
    pub state: Arc<AppState>,
}

#[async_trait]
impl salvo::Handler for StateHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.state));
    }
}

/// ## Summary
/// Retrieves the application state from the depot.
///
/// ## Errors
/// Returns an error if the state is not found in the depot.
pub fn get_state_from_depot(depot: &salvo::Depot) -> AppResult<Arc<AppState>> {
    depot.obtain::<Arc<AppState>>().cloned().map_err(|_err| {
        AppError::CoreError(kunai_core::error::CoreError::InvariantViolation(
            "Application state not found in depot",
        ))
    })
}
