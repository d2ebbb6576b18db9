//! MAPI property tags used for free/busy publishing.

use chrono::{DateTime, Utc};

/// MAPI property value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    /// `PT_LONG`
    Long,
    /// `PT_SYSTIME`
    SysTime,
    /// `PT_UNICODE`
    Unicode,
    /// `PT_MV_LONG`
    MvLong,
    /// `PT_MV_BINARY`
    MvBinary,
}

impl PropType {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Long => 0x0003,
            Self::SysTime => 0x0040,
            Self::Unicode => 0x001F,
            Self::MvLong => 0x1003,
            Self::MvBinary => 0x1102,
        }
    }

    /// `dt:dt` attribute value in WebDAV property updates.
    #[must_use]
    pub const fn dav_type(self) -> &'static str {
        match self {
            Self::Long => "int",
            Self::SysTime => "dateTime.tz",
            Self::Unicode => "string",
            Self::MvLong => "mv.int",
            Self::MvBinary => "mv.bin.base64",
        }
    }

    /// `PropertyType` attribute value in EWS extended field URIs.
    #[must_use]
    pub const fn ews_type(self) -> &'static str {
        match self {
            Self::Long => "Integer",
            Self::SysTime => "SystemTime",
            Self::Unicode => "String",
            Self::MvLong => "IntegerArray",
            Self::MvBinary => "BinaryArray",
        }
    }

    #[must_use]
    pub const fn is_multi_valued(self) -> bool {
        matches!(self, Self::MvLong | Self::MvBinary)
    }
}

/// A property identifier together with its value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropTag {
    pub id: u16,
    pub kind: PropType,
}

impl PropTag {
    #[must_use]
    pub const fn new(id: u16, kind: PropType) -> Self {
        Self { id, kind }
    }

    /// Full 32-bit tag: id in the high word, type in the low word.
    #[must_use]
    pub fn tag(self) -> u32 {
        (u32::from(self.id) << 16) | u32::from(self.kind.code())
    }

    /// Element name in the `mapi/proptag/` namespace, e.g. `x68470003`.
    #[must_use]
    pub fn dav_name(self) -> String {
        format!("x{:08x}", self.tag())
    }

    /// `PropertyTag` attribute value for EWS, e.g. `0x6847`.
    #[must_use]
    pub fn ews_tag(self) -> String {
        format!("0x{:04x}", self.id)
    }
}

/// Tags written when publishing free/busy.
pub mod tags {
    use super::{PropTag, PropType};

    pub const START_RANGE: PropTag = PropTag::new(0x6847, PropType::Long);
    pub const END_RANGE: PropTag = PropTag::new(0x6848, PropType::Long);
    pub const EMAIL_ADDRESS: PropTag = PropTag::new(0x6849, PropType::Unicode);
    pub const MERGED_MONTHS: PropTag = PropTag::new(0x684D, PropType::MvLong);
    pub const MERGED_EVENTS: PropTag = PropTag::new(0x684E, PropType::MvBinary);
    pub const TENTATIVE_MONTHS: PropTag = PropTag::new(0x6851, PropType::MvLong);
    pub const TENTATIVE_EVENTS: PropTag = PropTag::new(0x6852, PropType::MvBinary);
    pub const BUSY_MONTHS: PropTag = PropTag::new(0x6853, PropType::MvLong);
    pub const BUSY_EVENTS: PropTag = PropTag::new(0x6854, PropType::MvBinary);
    pub const OOF_MONTHS: PropTag = PropTag::new(0x6855, PropType::MvLong);
    pub const OOF_EVENTS: PropTag = PropTag::new(0x6856, PropType::MvBinary);
    pub const LAST_MODIFIED: PropTag = PropTag::new(0x6868, PropType::SysTime);
    pub const NUM_MONTHS: PropTag = PropTag::new(0x6869, PropType::Long);
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    Long(i64),
    SysTime(DateTime<Utc>),
    Unicode(String),
    MvLong(Vec<i32>),
    /// Base64-encoded binary values.
    MvBinary(Vec<String>),
}

impl PropValue {
    /// True for multi-valued properties with no values; these are removed
    /// rather than written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::MvLong(values) => values.is_empty(),
            Self::MvBinary(values) => values.is_empty(),
            Self::Long(_) | Self::SysTime(_) | Self::Unicode(_) => false,
        }
    }

    /// Scalar values as strings, multi-valued ones element by element.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Long(v) => vec![v.to_string()],
            Self::SysTime(t) => vec![t.format("%Y-%m-%dT%H:%M:%SZ").to_string()],
            Self::Unicode(s) => vec![s.clone()],
            Self::MvLong(values) => values.iter().map(ToString::to_string).collect(),
            Self::MvBinary(values) => values.clone(),
        }
    }
}
