use serde::{Deserialize, Serialize};

/// Busy status of a time range.
///
/// Variants are declared in ascending severity, so `Ord` is the merge
/// precedence: `Unavailable > Busy > Tentative > NoData > Free`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum FbStatus {
    #[default]
    Free,
    NoData,
    Tentative,
    Busy,
    Unavailable,
}

impl FbStatus {
    /// Combines two statuses; the more severe one wins.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        self.max(other)
    }

    /// Single-letter code used by the peer protocol.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Free => 'F',
            Self::NoData => 'N',
            Self::Tentative => 'T',
            Self::Busy => 'B',
            Self::Unavailable => 'O',
        }
    }

    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'F' => Some(Self::Free),
            'N' => Some(Self::NoData),
            'T' => Some(Self::Tentative),
            'B' => Some(Self::Busy),
            'O' => Some(Self::Unavailable),
            _ => None,
        }
    }

    /// `FBTYPE` parameter value, or `None` for statuses never written to iCalendar.
    #[must_use]
    pub const fn fbtype(self) -> Option<&'static str> {
        match self {
            Self::Busy => Some("BUSY"),
            Self::Tentative => Some("BUSY-TENTATIVE"),
            Self::Unavailable => Some("BUSY-UNAVAILABLE"),
            Self::Free | Self::NoData => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::NoData => "NODATA",
            Self::Tentative => "TENTATIVE",
            Self::Busy => "BUSY",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for FbStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order() {
        assert_eq!(FbStatus::Busy.combine(FbStatus::Unavailable), FbStatus::Unavailable);
        assert_eq!(FbStatus::Unavailable.combine(FbStatus::Busy), FbStatus::Unavailable);
        assert_eq!(FbStatus::Tentative.combine(FbStatus::Busy), FbStatus::Busy);
        assert_eq!(FbStatus::NoData.combine(FbStatus::Tentative), FbStatus::Tentative);
        assert_eq!(FbStatus::Free.combine(FbStatus::NoData), FbStatus::NoData);
    }

    #[test]
    fn codes_round_trip() {
        for status in [
            FbStatus::Free,
            FbStatus::NoData,
            FbStatus::Tentative,
            FbStatus::Busy,
            FbStatus::Unavailable,
        ] {
            assert_eq!(FbStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(FbStatus::from_code('x'), None);
    }

    #[test]
    fn fbtype_skips_free_and_nodata() {
        assert_eq!(FbStatus::Free.fbtype(), None);
        assert_eq!(FbStatus::NoData.fbtype(), None);
        assert_eq!(FbStatus::Unavailable.fbtype(), Some("BUSY-UNAVAILABLE"));
    }
}
