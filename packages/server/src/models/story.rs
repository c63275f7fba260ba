use chrono::{DateTime, Utc};
use common::tags::TagInput;
use serde::{Deserialize, Serialize};

use super::shared::{validate_body, validate_title};
use crate::entity::success_story;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateStoryRequest {
    #[schema(example = "From first hackathon to first job")]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: TagInput,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateStoryRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<TagInput>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StoryListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Only featured (`true`) or only regular (`false`) stories.
    pub featured: Option<bool>,
    pub author_id: Option<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct FeatureStoryRequest {
    pub featured: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct StoryResponse {
    pub id: i32,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryResponse {
    pub fn new(s: success_story::Model, author_name: Option<String>) -> Self {
        Self {
            tags: common::tags::from_json(&s.tags),
            id: s.id,
            author_id: s.author_id,
            author_name,
            title: s.title,
            content: s.content,
            is_featured: s.is_featured,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

pub fn validate_create_story(req: &CreateStoryRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body("Content", &req.content)
}

pub fn validate_update_story(req: &UpdateStoryRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref content) = req.content {
        validate_body("Content", content)?;
    }
    Ok(())
}
