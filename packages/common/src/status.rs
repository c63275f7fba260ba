#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// Lifecycle of a mentorship request.
///
/// `Pending` moves to `Active` or `Declined` once; only `Active` can be `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentorshipStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "PENDING"))]
    Pending,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "ACTIVE"))]
    Active,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "DECLINED"))]
    Declined,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "COMPLETED"))]
    Completed,
}

impl MentorshipStatus {
    pub const ALL: &'static [MentorshipStatus] =
        &[Self::Pending, Self::Active, Self::Declined, Self::Completed];

    /// Pending and active mentorships block a second request between the same pair.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Declined => "DECLINED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for MentorshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MentorshipStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("status", s, Self::ALL.iter().map(|v| v.as_str())))
    }
}

/// State of a single scheduled mentorship session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SCHEDULED"))]
    Scheduled,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "COMPLETED"))]
    Completed,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CANCELLED"))]
    Cancelled,
}

impl SessionStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Scheduled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
