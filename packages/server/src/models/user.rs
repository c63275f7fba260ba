use chrono::{DateTime, Utc};
use common::UserRole;
use common::tags::TagInput;
use serde::{Deserialize, Serialize};

use super::listing::ListingSummary;
use super::shared::double_option;
use crate::entity::user;
use crate::error::AppError;

/// Profile visible to anyone. Email and flags are omitted.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PublicProfile {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    pub role: UserRole,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub points: i32,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for PublicProfile {
    fn from(u: user::Model) -> Self {
        Self {
            skills: common::tags::from_json(&u.skills),
            id: u.id,
            name: u.name,
            role: u.role,
            bio: u.bio,
            points: u.points,
            level: u.level,
            created_at: u.created_at,
        }
    }
}

/// Partial profile update. Absent fields are left unchanged; `bio: null` clears it.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    /// Array of strings or a comma-separated string.
    pub skills: Option<TagInput>,
}

pub fn validate_update_profile(req: &UpdateProfileRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        super::auth::validate_name(name)?;
    }
    if let Some(Some(ref bio)) = req.bio
        && bio.chars().count() > 2000
    {
        return Err(AppError::Validation(
            "Bio must be at most 2000 characters".into(),
        ));
    }
    Ok(())
}

/// A listing the caller registered for.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationItem {
    pub listing: ListingSummary,
    pub registered_at: DateTime<Utc>,
}

/// A team the caller belongs to, with their role in it.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MyTeamItem {
    pub team_id: i32,
    pub team_name: String,
    pub listing_id: i32,
    pub role: common::MemberRole,
    pub joined_at: DateTime<Utc>,
}
