use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Set of mailbox item types touched by a local change.
///
/// Providers declare the types they care about; the change hook only
/// enqueues an account when the reported mask intersects that declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ItemTypeMask(u32);

impl ItemTypeMask {
    pub const NONE: Self = Self(0);
    pub const APPOINTMENT: Self = Self(1);
    pub const TASK: Self = Self(1 << 1);
    pub const MESSAGE: Self = Self(1 << 2);
    pub const CONTACT: Self = Self(1 << 3);
    pub const FOLDER: Self = Self(1 << 4);
    pub const ALL: Self = Self(0b1_1111);

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses a single item type name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "appointment" => Some(Self::APPOINTMENT),
            "task" => Some(Self::TASK),
            "message" => Some(Self::MESSAGE),
            "contact" => Some(Self::CONTACT),
            "folder" => Some(Self::FOLDER),
            "all" => Some(Self::ALL),
            _ => None,
        }
    }

    /// Builds a mask from type names, ignoring unknown ones.
    #[must_use]
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .filter_map(Self::from_name)
            .fold(Self::NONE, BitOr::bitor)
    }
}

impl BitOr for ItemTypeMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// How to authenticate against a foreign groupware server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    #[default]
    Basic,
    /// Outlook Web Access form login; the session lives in cookies.
    Form,
}

/// Connection descriptor for one foreign free/busy server.
///
/// Resolved per principal by the directory collaborator; this crate only
/// carries it around.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderServerInfo {
    /// Base URL of the server, without trailing slash.
    pub url: String,
    pub username: String,
    pub password: String,
    pub auth_scheme: AuthScheme,
    /// Legacy Exchange organization DN (`/o=.../ou=...`).
    pub org: String,
    /// Recipient common name of the account being published.
    pub cn: String,
}

impl std::fmt::Debug for ProviderServerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderServerInfo")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .field("org", &self.org)
            .field("cn", &self.cn)
            .finish()
    }
}
