use chrono::{DateTime, Utc};
use common::MemberRole;
use common::tags::TagInput;
use serde::{Deserialize, Serialize};

use crate::entity::team;
use crate::error::AppError;

pub const DEFAULT_MAX_MEMBERS: i32 = 4;
pub const MAX_TEAM_SIZE: i32 = 20;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    #[schema(example = "Null Pointers")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Including the leader. Defaults to 4.
    #[schema(example = 4)]
    pub max_members: Option<i32>,
    /// Skills the team is recruiting for. Array or comma-separated string.
    #[serde(default)]
    pub looking_for: TagInput,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<i32>,
    pub looking_for: Option<TagInput>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    pub id: i32,
    pub listing_id: i32,
    pub name: String,
    pub description: String,
    pub leader_id: i32,
    pub max_members: i32,
    pub looking_for: Vec<String>,
    pub member_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamResponse {
    pub fn new(t: team::Model, member_count: u64) -> Self {
        Self {
            looking_for: common::tags::from_json(&t.looking_for),
            id: t.id,
            listing_id: t.listing_id,
            name: t.name,
            description: t.description,
            leader_id: t.leader_id,
            max_members: t.max_members,
            member_count,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamMemberResponse {
    pub user_id: i32,
    pub name: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Team detail: the team fields plus its roster, leader first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamDetailResponse {
    #[serde(flatten)]
    pub team: TeamResponse,
    pub members: Vec<TeamMemberResponse>,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(AppError::Validation(
            "Team name must be 1-100 characters".into(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > 2000 {
        return Err(AppError::Validation(
            "Description must be at most 2000 characters".into(),
        ));
    }
    Ok(())
}

fn validate_max_members(max: i32) -> Result<(), AppError> {
    if !(2..=MAX_TEAM_SIZE).contains(&max) {
        return Err(AppError::Validation(format!(
            "max_members must be between 2 and {MAX_TEAM_SIZE}"
        )));
    }
    Ok(())
}

pub fn validate_create_team(req: &CreateTeamRequest) -> Result<(), AppError> {
    validate_name(&req.name)?;
    validate_description(&req.description)?;
    validate_max_members(req.max_members.unwrap_or(DEFAULT_MAX_MEMBERS))
}

pub fn validate_update_team(req: &UpdateTeamRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(max) = req.max_members {
        validate_max_members(max)?;
    }
    Ok(())
}
