//! Background delivery of one provider's sync queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::queue::SyncQueue;
use crate::provider::FreeBusyProvider;

/// Pops accounts off a [`SyncQueue`] and hands them to the provider.
///
/// After a failed delivery the account moves to the tail and the whole
/// queue waits out the retry interval before the next attempt.
pub struct Dispatcher {
    queue: Arc<SyncQueue>,
    provider: Arc<dyn FreeBusyProvider>,
    retry_interval: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        queue: Arc<SyncQueue>,
        provider: Arc<dyn FreeBusyProvider>,
        retry_interval: Duration,
    ) -> Self {
        Self {
            queue,
            provider,
            retry_interval,
        }
    }

    #[must_use]
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Runs until `cancel` fires. Cancellation is only observed while
    /// waiting, never in the middle of a delivery.
    #[tracing::instrument(skip_all, fields(provider = %self.provider.name()))]
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(retry_secs = self.retry_interval.as_secs(), "Sync dispatcher started");
        let mut backoff_until: Option<Instant> = None;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = self.queue.wait_for_work() => {}
            }

            if let Some(until) = backoff_until.take()
                && Instant::now() < until
            {
                tracing::debug!("Backing off before the next delivery");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep_until(until) => {}
                }
            }

            let Some(account) = self.queue.begin_dispatch().await else {
                continue;
            };
            let delivered = match self.provider.handle_mailbox_change(&account).await {
                Ok(()) => {
                    tracing::debug!(%account, "Pushed free/busy");
                    true
                }
                Err(err) => {
                    tracing::warn!(%account, error = %err, "Push failed, will retry");
                    backoff_until = Some(Instant::now() + self.retry_interval);
                    false
                }
            };
            if let Err(err) = self.queue.finish_dispatch(delivered).await {
                tracing::error!(%account, error = %err, "Failed to update sync queue");
            }
        }

        tracing::info!("Sync dispatcher stopped");
    }
}
