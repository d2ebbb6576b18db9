use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use kunai_core::config::SyncConfig;
use kunai_core::types::ItemTypeMask;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::dispatcher::Dispatcher;
use super::queue::{SyncQueue, validate_account_id};
use crate::error::{ServiceError, ServiceResult};
use crate::provider::ProviderRegistry;

/// Owns one queue per push provider and routes local changes into them.
pub struct SyncManager {
    registry: Arc<ProviderRegistry>,
    queues: BTreeMap<String, Arc<SyncQueue>>,
    retry_interval: Duration,
}

impl SyncManager {
    /// Opens the queue of every provider that accepts mailbox changes.
    ///
    /// ## Errors
    /// Returns `ServiceError::IoError` if a queue directory or file is unusable.
    pub async fn open(registry: Arc<ProviderRegistry>, config: &SyncConfig) -> ServiceResult<Self> {
        let mut queues = BTreeMap::new();
        for provider in registry.push_providers() {
            let queue =
                SyncQueue::open(provider.name(), &config.queue_dir, config.max_file_bytes).await?;
            queues.insert(provider.name().to_string(), Arc::new(queue));
        }
        Ok(Self {
            registry,
            queues,
            retry_interval: Duration::from_secs(config.retry_interval_secs),
        })
    }

    /// Local-change hook. Queues `account_id` for every provider that wants
    /// this kind of change for this account, and returns how many did.
    ///
    /// Never fails; a queue that cannot take the account logs the reason.
    #[tracing::instrument(skip(self, changed), fields(changed = changed.bits()))]
    pub async fn on_mailbox_changed(&self, account_id: &str, changed: ItemTypeMask) -> usize {
        let mut queued = 0;
        for provider in self.registry.push_providers() {
            if !provider.accepted_item_types().intersects(changed)
                || !provider.registers_for_account(account_id)
            {
                continue;
            }
            let Some(queue) = self.queues.get(provider.name()) else {
                continue;
            };
            match queue.enqueue(account_id).await {
                Ok(_) => queued += 1,
                Err(err) => {
                    tracing::error!(provider = provider.name(), error = %err, "Could not queue change");
                }
            }
        }
        queued
    }

    /// Queues an explicit list of accounts for one provider, for example
    /// to publish a whole domain for the first time.
    ///
    /// ## Errors
    /// Returns `ServiceError::NotFound` for an unknown provider,
    /// `ServiceError::InvalidAccountId` before anything is queued if any id
    /// is malformed, and `ServiceError::QueueOverflow` once the queue is full.
    #[tracing::instrument(skip(self, accounts), fields(count = accounts.len()))]
    pub async fn push_accounts(&self, provider: &str, accounts: &[String]) -> ServiceResult<usize> {
        let queue = self.queue(provider)?;
        for account in accounts {
            validate_account_id(account)?;
        }
        let mut added = 0;
        for account in accounts {
            if queue.enqueue(account).await? {
                added += 1;
            }
        }
        tracing::info!(added, "Queued accounts for push");
        Ok(added)
    }

    /// ## Errors
    /// Returns `ServiceError::NotFound` for an unknown provider.
    pub async fn pending(&self, provider: &str) -> ServiceResult<Vec<String>> {
        Ok(self.queue(provider)?.pending().await)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    fn queue(&self, provider: &str) -> ServiceResult<&Arc<SyncQueue>> {
        self.queues
            .get(provider)
            .ok_or_else(|| ServiceError::NotFound(format!("sync queue for {provider}")))
    }

    /// Starts one dispatcher per queue.
    #[must_use]
    pub fn spawn_dispatchers(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.registry
            .push_providers()
            .filter_map(|provider| {
                let queue = self.queues.get(provider.name())?;
                Some(
                    Dispatcher::new(Arc::clone(queue), Arc::clone(provider), self.retry_interval)
                        .spawn(cancel.child_token()),
                )
            })
            .collect()
    }
}
