use chrono::{DateTime, Utc};
use common::tags::TagInput;
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_body, validate_title};
use crate::entity::idea;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateIdeaRequest {
    #[schema(example = "Offline-first campus map")]
    pub title: String,
    pub description: String,
    /// Array or comma-separated string.
    #[serde(default)]
    pub tech_stack: TagInput,
    #[schema(example = "mobile")]
    pub category: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateIdeaRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<TagInput>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdeaListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub category: Option<String>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
    /// `created_at` (default) or `votes`.
    pub sort_by: Option<String>,
    /// `desc` (default) or `asc`.
    pub sort_order: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct IdeaResponse {
    pub id: i32,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub category: Option<String>,
    pub votes: i32,
    /// Whether the caller voted; `false` for anonymous callers.
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdeaResponse {
    pub fn new(i: idea::Model, author_name: Option<String>, has_voted: bool) -> Self {
        Self {
            tech_stack: common::tags::from_json(&i.tech_stack),
            id: i.id,
            author_id: i.author_id,
            author_name,
            title: i.title,
            description: i.description,
            category: i.category,
            votes: i.votes,
            has_voted,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub idea_id: i32,
    pub votes: i32,
    pub has_voted: bool,
}

/// Trim and lowercase; blank means no category.
pub fn normalize_category(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let Some(category) = raw.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    if category.chars().count() > 50 {
        return Err(AppError::Validation(
            "Category must be at most 50 characters".into(),
        ));
    }
    Ok(Some(category.to_lowercase()))
}

pub fn validate_create_idea(req: &CreateIdeaRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body("Description", &req.description)?;
    normalize_category(req.category.as_deref()).map(|_| ())
}

pub fn validate_update_idea(req: &UpdateIdeaRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_body("Description", description)?;
    }
    if let Some(Some(ref category)) = req.category {
        normalize_category(Some(category))?;
    }
    Ok(())
}
