#![allow(clippy::unused_async, clippy::expect_used, clippy::unwrap_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Provides utilities for:
//! - Building node settings rooted in a temporary directory
//! - Seeding mailbox files for the JSON calendar store
//! - Assembling the registry, application state, and Salvo service
//! - Canned Exchange responses for the mock server

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use salvo::prelude::*;
use tempfile::TempDir;

use kunai_test::app::api::routes;
use kunai_test::app::state::{AppState, StateHandler};
use kunai_test::app::store::JsonCalendarStore;
use kunai_test::component::config::{
    AccountConfig, DirectoryConfig, ExchangeConfig, ExchangeProtocol, LoggingConfig, NodeConfig,
    PeerConfig, ServerConfig, Settings, StoreConfig, SyncConfig, build_registry,
};
use kunai_test::component::directory::{Directory, StaticDirectory};
use kunai_test::component::model::{FbStatus, FreeBusy};
use kunai_test::component::provider::ProviderRegistry;
use kunai_test::component::provider::local::CalendarStore;
use kunai_test::component::types::AuthScheme;

pub const NODE: &str = "node1";
pub const PEER_NODE: &str = "node2";
pub const EXCHANGE: &str = "exchange";
pub const ORG: &str = "/o=Legacy/ou=First Administrative Group";

/// Working days Monday to Friday, 09:00 to 17:00.
pub const OFFICE_HOURS: &str =
    "1:N:0000:2400,2:Y:0900:1700,3:Y:0900:1700,4:Y:0900:1700,5:Y:0900:1700,6:Y:0900:1700,7:N:0000:2400";

/// A time in the week of Monday 2024-03-04.
pub fn t(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

fn account(id: &str, host: &str) -> AccountConfig {
    AccountConfig {
        id: id.to_string(),
        email: format!("{id}@corp.example"),
        host: host.to_string(),
        timezone: None,
        working_hours: None,
        exchange_cn: None,
    }
}

/// A node named `node1` hosting alice and erin, with bob on `node2`.
pub struct TestEnv {
    pub dir: TempDir,
    pub settings: Settings,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let mut alice = account("alice", NODE);
        alice.working_hours = Some(OFFICE_HOURS.to_string());
        let settings = Settings {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5800,
                serve_origin: None,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
            node: NodeConfig {
                hostname: NODE.to_string(),
            },
            sync: SyncConfig {
                queue_dir: root.join("queue").display().to_string(),
                retry_interval_secs: 1,
                max_file_bytes: 10_240,
            },
            exchange: Vec::new(),
            peers: Vec::new(),
            directory: DirectoryConfig {
                accounts: vec![alice, account("erin", NODE), account("bob", PEER_NODE)],
            },
            store: StoreConfig {
                dir: root.join("store").display().to_string(),
            },
        };
        std::fs::create_dir_all(&settings.store.dir).expect("Failed to create store dir");
        Self { dir, settings }
    }

    #[must_use]
    pub fn with_peer(mut self, url: &str) -> Self {
        self.settings.peers.push(PeerConfig {
            hostname: PEER_NODE.to_string(),
            url: url.to_string(),
        });
        self
    }

    /// Routes `legacy.example` to an Exchange server at `url`.
    #[must_use]
    pub fn with_exchange(mut self, protocol: ExchangeProtocol, url: &str, auth: AuthScheme) -> Self {
        self.settings.exchange.push(ExchangeConfig {
            name: EXCHANGE.to_string(),
            protocol,
            url: url.to_string(),
            username: "svc".to_string(),
            password: "secret".to_string(),
            auth_scheme: auth,
            org: ORG.to_string(),
            domains: vec!["legacy.example".to_string()],
        });
        self
    }

    pub fn queue_dir(&self) -> &Path {
        Path::new(&self.settings.sync.queue_dir)
    }

    /// Writes `<store>/<account>.json`.
    pub fn write_mailbox(&self, account_id: &str, mailbox: &serde_json::Value) {
        let path = Path::new(&self.settings.store.dir).join(format!("{account_id}.json"));
        std::fs::write(path, serde_json::to_vec_pretty(mailbox).unwrap())
            .expect("Failed to write mailbox");
    }

    /// Alice is busy Tuesday 09:00-10:00 and tentative 13:00-14:00.
    pub fn seed_alice(&self) {
        self.write_mailbox(
            "alice",
            &serde_json::json!({
                "instances": [
                    {"status": "Busy", "start": "2024-03-05T09:00:00Z", "end": "2024-03-05T10:00:00Z", "item_id": "standup"},
                    {"status": "Tentative", "start": "2024-03-05T13:00:00Z", "end": "2024-03-05T14:00:00Z", "item_id": "lunch-talk"}
                ]
            }),
        );
    }

    pub fn registry(&self) -> Arc<ProviderRegistry> {
        let directory: Arc<dyn Directory> =
            Arc::new(StaticDirectory::from_config(&self.settings.directory));
        let store: Arc<dyn CalendarStore> =
            Arc::new(JsonCalendarStore::new(&self.settings.store.dir));
        build_registry(&self.settings, directory, store).expect("Failed to build registry")
    }

    pub async fn state(&self) -> Arc<AppState> {
        Arc::new(
            AppState::from_settings(self.settings.clone())
                .await
                .expect("Failed to build application state"),
        )
    }
}

/// The full router with `state` injected, as the binary serves it.
pub fn service(state: Arc<AppState>) -> Service {
    Service::new(
        Router::new()
            .hoop(StateHandler { state })
            .push(routes().expect("Failed to build routes")),
    )
}

/// Non-FREE intervals of `fb` as `(start, end, status)`.
pub fn busy_spans(fb: &FreeBusy) -> Vec<(DateTime<Utc>, DateTime<Utc>, FbStatus)> {
    fb.intervals()
        .filter(|i| i.status != FbStatus::Free)
        .map(|i| (i.start, i.end, i.status))
        .collect()
}

/// Polls `check` every 50ms until it holds or `timeout` passes.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Wraps an EWS response body in a SOAP envelope.
pub fn soap(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
  xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
  xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
<s:Body>{body}</s:Body></s:Envelope>"#
    )
}

/// `FindFolder` answer listing `(id, display name)` folders.
pub fn find_folder_response(folders: &[(&str, &str)]) -> String {
    let folders: String = folders
        .iter()
        .map(|(id, name)| {
            format!(r#"<t:Folder><t:FolderId Id="{id}"/><t:DisplayName>{name}</t:DisplayName></t:Folder>"#)
        })
        .collect();
    soap(&format!(
        r#"<m:FindFolderResponse><m:ResponseMessages><m:FindFolderResponseMessage ResponseClass="Success">
<m:ResponseCode>NoError</m:ResponseCode><m:RootFolder><t:Folders>{folders}</t:Folders></m:RootFolder>
</m:FindFolderResponseMessage></m:ResponseMessages></m:FindFolderResponse>"#
    ))
}

/// `FindItem` answer listing `(id, change key, subject)` messages.
pub fn find_item_response(items: &[(&str, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(id, key, subject)| {
            format!(
                r#"<t:Message><t:ItemId Id="{id}" ChangeKey="{key}"/><t:Subject>{subject}</t:Subject></t:Message>"#
            )
        })
        .collect();
    soap(&format!(
        r#"<m:FindItemResponse><m:ResponseMessages><m:FindItemResponseMessage ResponseClass="Success">
<m:ResponseCode>NoError</m:ResponseCode><m:RootFolder><t:Items>{items}</t:Items></m:RootFolder>
</m:FindItemResponseMessage></m:ResponseMessages></m:FindItemResponse>"#
    ))
}

pub fn create_item_response(id: &str, key: &str) -> String {
    soap(&format!(
        r#"<m:CreateItemResponse><m:ResponseMessages><m:CreateItemResponseMessage ResponseClass="Success">
<m:ResponseCode>NoError</m:ResponseCode><m:Items><t:Message><t:ItemId Id="{id}" ChangeKey="{key}"/></t:Message></m:Items>
</m:CreateItemResponseMessage></m:ResponseMessages></m:CreateItemResponse>"#
    ))
}

pub fn update_item_response() -> String {
    soap(
        r#"<m:UpdateItemResponse><m:ResponseMessages><m:UpdateItemResponseMessage ResponseClass="Success">
<m:ResponseCode>NoError</m:ResponseCode></m:UpdateItemResponseMessage></m:ResponseMessages></m:UpdateItemResponse>"#,
    )
}

/// WebDAV `?cmd=freebusy` answer for `(address, merged digits)` recipients.
pub fn webdav_freebusy_response(recipients: &[(&str, &str)]) -> String {
    let items: String = recipients
        .iter()
        .map(|(email, fbdata)| {
            format!(
                r#"<a:item><a:email type="SMTP">{email}</a:email><a:type>1</a:type><a:fbdata>{fbdata}</a:fbdata></a:item>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><a:response xmlns:a="WM"><a:recipients>{items}</a:recipients></a:response>"#
    )
}
