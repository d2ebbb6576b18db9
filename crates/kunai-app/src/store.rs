//! Calendar store backed by one JSON file per account.
//!
//! `<dir>/<account id>.json` holds the already-expanded appointment
//! instances of a mailbox plus its sharing flag and scheduling
//! preferences. A missing file is an empty, shared mailbox.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kunai_core::model::{FbInstance, FbStatus};
use kunai_service::directory::Account;
use kunai_service::error::{ServiceError, ServiceResult};
use kunai_service::provider::local::{CalendarStore, Preferences};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StoredInstance {
    status: FbStatus,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    item_id: String,
    #[serde(default)]
    recurrence_id: Option<DateTime<Utc>>,
}

impl From<StoredInstance> for FbInstance {
    fn from(stored: StoredInstance) -> Self {
        Self::new(
            stored.status,
            stored.start,
            stored.end,
            stored.item_id,
            stored.recurrence_id,
        )
    }
}

const fn shared_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct StoredMailbox {
    #[serde(default = "shared_by_default")]
    share_freebusy: bool,
    #[serde(default)]
    instances: Vec<StoredInstance>,
    #[serde(default)]
    working_hours: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

/// Reads mailboxes from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonCalendarStore {
    dir: PathBuf,
}

impl JsonCalendarStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, account_id: &str) -> PathBuf {
        let safe: String = account_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    async fn load(&self, account: &Account) -> ServiceResult<Option<StoredMailbox>> {
        let path = self.path_for(&account.id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mailbox: StoredMailbox = serde_json::from_slice(&bytes).map_err(|err| {
            tracing::error!(path = %path.display(), error = %err, "Unreadable mailbox file");
            ServiceError::IoError(err.into())
        })?;
        Ok(Some(mailbox))
    }
}

#[async_trait]
impl CalendarStore for JsonCalendarStore {
    async fn instances(
        &self,
        account: &Account,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ServiceResult<Vec<FbInstance>> {
        let Some(mailbox) = self.load(account).await? else {
            return Ok(Vec::new());
        };
        if !mailbox.share_freebusy {
            return Err(ServiceError::PermissionDenied(format!(
                "{} does not share free/busy",
                account.email
            )));
        }
        Ok(mailbox
            .instances
            .into_iter()
            .filter(|i| i.start < end && i.end > start)
            .map(FbInstance::from)
            .collect())
    }

    async fn preferences(&self, account: &Account) -> ServiceResult<Preferences> {
        let stored = self.load(account).await?;
        let (working_hours, timezone) = match stored {
            Some(mailbox) => (mailbox.working_hours, mailbox.timezone),
            None => (None, None),
        };
        Ok(Preferences {
            working_hours: working_hours.or_else(|| account.working_hours.clone()),
            timezone: timezone.or_else(|| account.timezone.clone()),
        })
    }
}
