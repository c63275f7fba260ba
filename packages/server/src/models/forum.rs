use chrono::{DateTime, Utc};
use common::tags::TagInput;
use serde::{Deserialize, Serialize};

use super::shared::{validate_body, validate_title};
use crate::entity::{forum, forum_reply};
use crate::error::AppError;

pub const DEFAULT_CATEGORY: &str = "general";

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateForumRequest {
    #[schema(example = "Looking for a Rust mentor")]
    pub title: String,
    pub content: String,
    /// Free-form, stored lowercase. Defaults to `general`.
    #[schema(example = "help")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: TagInput,
}

/// Partial update. `is_pinned` is honoured for admins only.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateForumRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<TagInput>,
    pub is_pinned: Option<bool>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ForumListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub category: Option<String>,
    /// Case-insensitive match on title or content.
    pub search: Option<String>,
    pub tag: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateReplyRequest {
    pub content: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ForumSummary {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub views: i32,
    pub is_pinned: bool,
    pub reply_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ForumSummary {
    pub fn new(f: forum::Model, author_name: Option<String>, reply_count: u64) -> Self {
        Self {
            tags: common::tags::from_json(&f.tags),
            id: f.id,
            title: f.title,
            category: f.category,
            author_id: f.author_id,
            author_name,
            views: f.views,
            is_pinned: f.is_pinned,
            reply_count,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReplyResponse {
    pub id: i32,
    pub forum_id: i32,
    pub author_id: i32,
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReplyResponse {
    pub fn new(r: forum_reply::Model, author_name: Option<String>) -> Self {
        Self {
            id: r.id,
            forum_id: r.forum_id,
            author_id: r.author_id,
            author_name,
            content: r.content,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// A thread with its body and replies (oldest first).
#[derive(Serialize, utoipa::ToSchema)]
pub struct ForumDetail {
    #[serde(flatten)]
    pub summary: ForumSummary,
    pub content: String,
    pub replies: Vec<ReplyResponse>,
}

/// Trim and lowercase a category, falling back to the default.
pub fn normalize_category(raw: Option<&str>) -> Result<String, AppError> {
    let category = raw.map(str::trim).unwrap_or(DEFAULT_CATEGORY).to_lowercase();
    if category.is_empty() || category.chars().count() > 50 {
        return Err(AppError::Validation(
            "Category must be 1-50 characters".into(),
        ));
    }
    Ok(category)
}

pub fn validate_create_forum(req: &CreateForumRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_body("Content", &req.content)?;
    normalize_category(req.category.as_deref()).map(|_| ())
}

pub fn validate_update_forum(req: &UpdateForumRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref content) = req.content {
        validate_body("Content", content)?;
    }
    if let Some(ref category) = req.category {
        normalize_category(Some(category))?;
    }
    Ok(())
}

pub fn validate_reply(req: &CreateReplyRequest) -> Result<(), AppError> {
    if req.content.trim().is_empty() || req.content.len() > 20_000 {
        return Err(AppError::Validation(
            "Reply must be non-empty and at most 20KB".into(),
        ));
    }
    Ok(())
}
