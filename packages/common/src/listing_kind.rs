#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ParseEnumError;

/// The event-like resources a host can publish.
///
/// All kinds share one table and one set of handlers; the kind decides the
/// URL segment the handlers are mounted under and the wording of messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "HACKATHON"))]
    Hackathon,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "EVENT"))]
    Event,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "CONFERENCE"))]
    Conference,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "COURSE"))]
    Course,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "TUTORIAL"))]
    Tutorial,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "WEB_CONTEST"))]
    WebContest,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "AI_CHALLENGE"))]
    AiChallenge,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "MOBILE_INNOVATION"))]
    MobileInnovation,
}

impl ListingKind {
    pub const ALL: &'static [ListingKind] = &[
        Self::Hackathon,
        Self::Event,
        Self::Conference,
        Self::Course,
        Self::Tutorial,
        Self::WebContest,
        Self::AiChallenge,
        Self::MobileInnovation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hackathon => "HACKATHON",
            Self::Event => "EVENT",
            Self::Conference => "CONFERENCE",
            Self::Course => "COURSE",
            Self::Tutorial => "TUTORIAL",
            Self::WebContest => "WEB_CONTEST",
            Self::AiChallenge => "AI_CHALLENGE",
            Self::MobileInnovation => "MOBILE_INNOVATION",
        }
    }

    /// URL segment under `/api/v1`, e.g. `web-contests`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Hackathon => "hackathons",
            Self::Event => "events",
            Self::Conference => "conferences",
            Self::Course => "courses",
            Self::Tutorial => "tutorials",
            Self::WebContest => "web-contests",
            Self::AiChallenge => "ai-challenges",
            Self::MobileInnovation => "mobile-innovations",
        }
    }

    /// Capitalised singular, used at the start of messages ("Hackathon is full").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hackathon => "Hackathon",
            Self::Event => "Event",
            Self::Conference => "Conference",
            Self::Course => "Course",
            Self::Tutorial => "Tutorial",
            Self::WebContest => "Web contest",
            Self::AiChallenge => "AI challenge",
            Self::MobileInnovation => "Mobile innovation",
        }
    }

    /// Lowercase plural, used inside messages ("Only hosts can create hackathons").
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Hackathon => "hackathons",
            Self::Event => "events",
            Self::Conference => "conferences",
            Self::Course => "courses",
            Self::Tutorial => "tutorials",
            Self::WebContest => "web contests",
            Self::AiChallenge => "AI challenges",
            Self::MobileInnovation => "mobile innovations",
        }
    }

    /// Whether teams can be formed around this kind of listing.
    pub fn supports_teams(&self) -> bool {
        matches!(
            self,
            Self::Hackathon | Self::WebContest | Self::AiChallenge | Self::MobileInnovation
        )
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingKind {
    type Err = ParseEnumError;

    /// Accepts either the stored name (`WEB_CONTEST`) or the URL segment (`web-contests`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s) || k.path_segment() == s)
            .ok_or_else(|| ParseEnumError::new("kind", s, Self::ALL.iter().map(|k| k.as_str())))
    }
}
