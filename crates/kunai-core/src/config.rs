use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{DEFAULT_RETRY_INTERVAL_SECS, MAX_QUEUE_FILE_BYTES};
use crate::types::AuthScheme;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub node: NodeConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub exchange: Vec<ExchangeConfig>,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub directory: DirectoryConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub serve_origin: Option<String>,
}

impl ServerConfig {
    /// ## Summary
    /// Returns the origin built from the bind host and port.
    #[must_use]
    pub fn serve_origin(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// ## Summary
    /// Returns the server origin URL.
    #[must_use]
    pub fn origin(&self) -> String {
        if let Some(origin) = &self.serve_origin {
            origin.clone()
        } else {
            self.serve_origin()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Identity of this node among its peers.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub hostname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Directory holding one queue file per push provider.
    pub queue_dir: String,
    pub retry_interval_secs: u64,
    pub max_file_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeProtocol {
    Webdav,
    Ews,
}

/// One configured Exchange integration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub protocol: ExchangeProtocol,
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    pub org: String,
    /// Mail domains whose principals live on this Exchange server.
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Another kunai node hosting part of the account population.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    pub hostname: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub email: String,
    /// Hostname of the node owning the mailbox.
    pub host: String,
    pub timezone: Option<String>,
    pub working_hours: Option<String>,
    /// Exchange recipient CN used when pushing; defaults to the local part.
    pub exchange_cn: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory of `<account id>.json` instance files.
    pub dir: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8699)?
            .set_default("logging.level", "debug")?
            .set_default("node.hostname", "localhost")?
            .set_default("sync.queue_dir", "/var/lib/kunai/fbqueue")?
            .set_default("sync.retry_interval_secs", DEFAULT_RETRY_INTERVAL_SECS)?
            .set_default("sync.max_file_bytes", MAX_QUEUE_FILE_BYTES)?
            .set_default("store.dir", "/var/lib/kunai/store")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
