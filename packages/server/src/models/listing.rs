use chrono::{DateTime, Utc};
use common::ListingKind;
use common::tags::TagInput;
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_body, validate_title};
use crate::entity::listing;
use crate::error::AppError;
use crate::utils::listing::ListingStatus;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateListingRequest {
    #[schema(example = "Spring Hack 2026")]
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    /// Omit for unlimited.
    #[schema(example = 100)]
    pub max_participants: Option<i32>,
    /// Array of strings or a comma-separated string.
    #[serde(default)]
    pub tags: TagInput,
    pub prize_pool: Option<String>,
    pub difficulty: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update. Nullable columns accept `null` to clear them.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    pub is_online: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub max_participants: Option<Option<i32>>,
    pub tags: Option<TagInput>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub prize_pool: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub difficulty: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    /// Only listings carrying this tag.
    pub tag: Option<String>,
    /// `upcoming`, `ongoing` or `past`.
    pub status: Option<String>,
    pub host_id: Option<i32>,
    /// `start_date` (default), `created_at` or `title`.
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`.
    pub sort_order: Option<String>,
}

/// Full listing detail.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ListingResponse {
    pub id: i32,
    pub kind: ListingKind,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub is_online: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub max_participants: Option<i32>,
    pub tags: Vec<String>,
    pub prize_pool: Option<String>,
    pub difficulty: Option<String>,
    pub image_url: Option<String>,
    pub host_id: i32,
    pub status: ListingStatus,
    pub participant_count: u64,
    /// Whether the caller is registered; `false` for anonymous callers.
    pub is_registered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListingResponse {
    pub fn new(m: listing::Model, participant_count: u64, is_registered: bool) -> Self {
        Self {
            status: ListingStatus::at(&m, Utc::now()),
            tags: common::tags::from_json(&m.tags),
            id: m.id,
            kind: m.kind,
            title: m.title,
            description: m.description,
            location: m.location,
            is_online: m.is_online,
            start_date: m.start_date,
            end_date: m.end_date,
            registration_deadline: m.registration_deadline,
            max_participants: m.max_participants,
            prize_pool: m.prize_pool,
            difficulty: m.difficulty,
            image_url: m.image_url,
            host_id: m.host_id,
            participant_count,
            is_registered,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Listing row in list responses (no description).
#[derive(Serialize, utoipa::ToSchema)]
pub struct ListingSummary {
    pub id: i32,
    pub kind: ListingKind,
    pub title: String,
    pub location: Option<String>,
    pub is_online: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_participants: Option<i32>,
    pub tags: Vec<String>,
    pub host_id: i32,
    pub status: ListingStatus,
    pub participant_count: u64,
}

impl ListingSummary {
    pub fn new(m: listing::Model, participant_count: u64) -> Self {
        Self {
            status: ListingStatus::at(&m, Utc::now()),
            tags: common::tags::from_json(&m.tags),
            id: m.id,
            kind: m.kind,
            title: m.title,
            location: m.location,
            is_online: m.is_online,
            start_date: m.start_date,
            end_date: m.end_date,
            max_participants: m.max_participants,
            host_id: m.host_id,
            participant_count,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationResponse {
    pub listing_id: i32,
    pub user_id: i32,
    pub registered_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> Result<(), AppError> {
    if let Some(v) = value
        && (v.trim().is_empty() || v.chars().count() > max)
    {
        return Err(AppError::Validation(format!(
            "{field} must be 1-{max} characters when present"
        )));
    }
    Ok(())
}

fn validate_capacity(max: Option<i32>) -> Result<(), AppError> {
    if let Some(max) = max
        && !(1..=100_000).contains(&max)
    {
        return Err(AppError::Validation(
            "max_participants must be between 1 and 100000".into(),
        ));
    }
    Ok(())
}

/// Cross-field date rules shared by create and update (after merging with stored values).
pub fn validate_dates(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Validation(
            "end_date must be after start_date".into(),
        ));
    }
    if let Some(deadline) = deadline
        && deadline > end
    {
        return Err(AppError::Validation(
            "registration_deadline must not be after end_date".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_listing(req: &CreateListingRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body("Description", &req.description)?;
    validate_optional_text("location", req.location.as_deref(), 200)?;
    validate_optional_text("prize_pool", req.prize_pool.as_deref(), 100)?;
    validate_optional_text("difficulty", req.difficulty.as_deref(), 32)?;
    validate_optional_text("image_url", req.image_url.as_deref(), 2048)?;
    validate_capacity(req.max_participants)?;
    validate_dates(req.start_date, req.end_date, req.registration_deadline)
}

pub fn validate_update_listing(req: &UpdateListingRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_body("Description", description)?;
    }
    validate_optional_text("location", req.location.clone().flatten().as_deref(), 200)?;
    validate_optional_text("prize_pool", req.prize_pool.clone().flatten().as_deref(), 100)?;
    validate_optional_text("difficulty", req.difficulty.clone().flatten().as_deref(), 32)?;
    validate_optional_text("image_url", req.image_url.clone().flatten().as_deref(), 2048)?;
    validate_capacity(req.max_participants.flatten())
}
