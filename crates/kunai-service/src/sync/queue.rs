//! Per-provider outbound queue of account ids, mirrored to disk.
//!
//! The file holds the total number of lines (header included) on its first
//! line, then one account id per line. A file whose header disagrees with
//! its content, or which exceeds the size cap, is discarded on open.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, Notify};

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<String>,
    /// The head is being delivered and must stay persisted until it succeeds.
    in_flight: bool,
}

impl QueueState {
    /// True if `account` is waiting, not counting a head that is in flight.
    fn is_waiting(&self, account: &str) -> bool {
        let skip = usize::from(self.in_flight);
        self.entries.iter().skip(skip).any(|e| e == account)
    }

    fn render(&self) -> String {
        let mut out = format!("{}\n", self.entries.len() + 1);
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }
}

fn parse_queue_file(content: &str) -> Result<VecDeque<String>, String> {
    let mut lines = content.lines();
    let header = lines.next().ok_or("empty file")?;
    let expected: usize = header
        .trim()
        .parse()
        .map_err(|err| format!("bad line count {header:?}: {err}"))?;
    let entries: VecDeque<String> = lines
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if entries.len() + 1 != expected {
        return Err(format!(
            "header says {expected} lines, found {}",
            entries.len() + 1
        ));
    }
    Ok(entries)
}

/// Checks that `account` can be stored as one queue file line and read back
/// unchanged.
///
/// ## Errors
/// Returns `ServiceError::InvalidAccountId` for an empty id, an id with
/// control characters, or one with surrounding whitespace.
pub fn validate_account_id(account: &str) -> ServiceResult<()> {
    if account.is_empty()
        || account.chars().any(char::is_control)
        || account.trim() != account
    {
        return Err(ServiceError::InvalidAccountId(account.to_string()));
    }
    Ok(())
}

/// File name for a provider's queue.
fn queue_file_name(provider: &str) -> String {
    let safe: String = provider
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}.queue")
}

/// Ordered, deduplicated queue of accounts awaiting a push.
///
/// Every mutation is written through to the queue file while the lock is
/// held.
#[derive(Debug)]
pub struct SyncQueue {
    provider: String,
    path: PathBuf,
    max_file_bytes: u64,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl SyncQueue {
    /// Opens the queue of `provider` under `dir`, restoring what a previous
    /// run left behind.
    ///
    /// ## Errors
    /// Returns `ServiceError::IoError` if the directory cannot be created or
    /// the file cannot be read or rewritten. A corrupt file is not an error.
    #[tracing::instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub async fn open(
        provider: &str,
        dir: impl AsRef<Path>,
        max_file_bytes: u64,
    ) -> ServiceResult<Self> {
        tokio::fs::create_dir_all(dir.as_ref()).await?;
        let path = dir.as_ref().join(queue_file_name(provider));
        let queue = Self {
            provider: provider.to_string(),
            path,
            max_file_bytes,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        };

        let mut state = queue.state.lock().await;
        match queue.load().await {
            Ok(entries) => {
                if !entries.is_empty() {
                    tracing::info!(pending = entries.len(), "Restored sync queue");
                    queue.notify.notify_one();
                }
                state.entries = entries;
            }
            Err(ServiceError::CorruptQueueFile(reason)) => {
                tracing::warn!(path = %queue.path.display(), %reason, "Discarding corrupt sync queue");
                queue.persist(&state).await?;
            }
            Err(err) => return Err(err),
        }
        drop(state);
        Ok(queue)
    }

    async fn load(&self) -> ServiceResult<VecDeque<String>> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(VecDeque::new()),
            Err(err) => return Err(err.into()),
        };
        if metadata.len() > self.max_file_bytes {
            return Err(ServiceError::CorruptQueueFile(format!(
                "{} bytes exceeds the {} byte cap",
                metadata.len(),
                self.max_file_bytes
            )));
        }
        let content = tokio::fs::read(&self.path).await?;
        let content = String::from_utf8(content)
            .map_err(|err| ServiceError::CorruptQueueFile(err.to_string()))?;
        parse_queue_file(&content).map_err(ServiceError::CorruptQueueFile)
    }

    /// Writes `state` next to the queue file and renames it into place.
    async fn persist(&self, state: &QueueState) -> ServiceResult<()> {
        let content = state.render();
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, content.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `account` unless it is already waiting.
    ///
    /// Returns whether the account was added. An account whose only entry
    /// is the head being delivered is added again, since that delivery may
    /// predate the change.
    ///
    /// ## Errors
    /// Returns `ServiceError::InvalidAccountId` for an id that does not fit
    /// on one line, and `ServiceError::QueueOverflow` when the file would
    /// exceed its cap; the queue is left unchanged. I/O errors are returned
    /// as well.
    #[tracing::instrument(skip(self), fields(provider = %self.provider))]
    pub async fn enqueue(&self, account: &str) -> ServiceResult<bool> {
        validate_account_id(account)?;
        let mut state = self.state.lock().await;
        if state.is_waiting(account) {
            tracing::trace!("Account already queued");
            return Ok(false);
        }

        state.entries.push_back(account.to_string());
        let size = u64::try_from(state.render().len()).unwrap_or(u64::MAX);
        if size > self.max_file_bytes {
            state.entries.pop_back();
            tracing::error!(size, cap = self.max_file_bytes, "Sync queue full, dropping change");
            return Err(ServiceError::QueueOverflow(format!(
                "{} queue would grow to {size} bytes",
                self.provider
            )));
        }
        if let Err(err) = self.persist(&state).await {
            state.entries.pop_back();
            return Err(err);
        }
        drop(state);
        self.notify.notify_one();
        Ok(true)
    }

    /// Marks the head as in flight and returns it. It stays in the queue
    /// file until [`Self::finish_dispatch`] reports success.
    pub async fn begin_dispatch(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        let head = state.entries.front().cloned()?;
        state.in_flight = true;
        Some(head)
    }

    /// Completes the delivery started by [`Self::begin_dispatch`]. A failed
    /// head moves to the tail unless it is already waiting there.
    ///
    /// ## Errors
    /// Returns `ServiceError::IoError` if the queue file cannot be written.
    pub async fn finish_dispatch(&self, success: bool) -> ServiceResult<()> {
        let mut state = self.state.lock().await;
        if !state.in_flight {
            return Ok(());
        }
        state.in_flight = false;
        let Some(head) = state.entries.pop_front() else {
            return Ok(());
        };
        if !success && !state.is_waiting(&head) {
            state.entries.push_back(head);
        }
        self.persist(&state).await
    }

    /// Snapshot of the waiting accounts, head first.
    pub async fn pending(&self) -> Vec<String> {
        self.state.lock().await.entries.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Resolves once the queue holds at least one entry.
    pub async fn wait_for_work(&self) {
        loop {
            if !self.state.lock().await.entries.is_empty() {
                return;
            }
            self.notify.notified().await;
        }
    }
}
