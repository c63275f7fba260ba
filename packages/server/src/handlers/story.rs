use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{success_story, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::shared::{ApiResponse, NoData, Paginated, Pagination, page_params};
use crate::models::story::*;
use crate::state::AppState;
use crate::utils::access::{load_principal, require_admin, require_owner_or_admin};
use crate::utils::points;

async fn find_story<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<(success_story::Model, Option<String>), AppError> {
    let (story, author) = success_story::Entity::find_by_id(id)
        .find_also_related(user::Entity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Story not found"))?;
    Ok((story, author.map(|u| u.name)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Success Stories",
    operation_id = "listStories",
    summary = "List success stories",
    description = "Public, newest first. Filter on `featured` or `author_id`.",
    params(StoryListQuery),
    responses(
        (status = 200, description = "Page of stories", body = ApiResponse<Paginated<StoryResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_stories(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StoryListQuery>,
) -> Result<ApiResponse<Paginated<StoryResponse>>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = success_story::Entity::find();
    if let Some(featured) = query.featured {
        select = select.filter(success_story::Column::IsFeatured.eq(featured));
    }
    if let Some(author_id) = query.author_id {
        select = select.filter(success_story::Column::AuthorId.eq(author_id));
    }

    let total = select.clone().count(&state.db).await?;
    let rows = select
        .order_by_desc(success_story::Column::CreatedAt)
        .order_by_desc(success_story::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let items = rows
        .into_iter()
        .map(|(s, u)| StoryResponse::new(s, u.map(|u| u.name)))
        .collect();

    Ok(ApiResponse::ok(Paginated {
        items,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Success Stories",
    operation_id = "getStory",
    summary = "Get a success story",
    params(("id" = i32, Path, description = "Story ID")),
    responses(
        (status = 200, description = "Story", body = ApiResponse<StoryResponse>),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<StoryResponse>, AppError> {
    let (story, author) = find_story(&state.db, id).await?;
    Ok(ApiResponse::ok(StoryResponse::new(story, author)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Success Stories",
    operation_id = "createStory",
    summary = "Share a success story",
    description = "Any active user. Awards the author 20 points.",
    request_body = CreateStoryRequest,
    responses(
        (status = 201, description = "Story shared", body = ApiResponse<StoryResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateStoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    validate_create_story(&payload)?;
    let tags = payload.tags.normalize()?;

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let story = success_story::ActiveModel {
        author_id: Set(principal.id),
        title: Set(payload.title.trim().to_string()),
        content: Set(payload.content),
        tags: Set(common::tags::to_json(&tags)),
        is_featured: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    points::award(&txn, principal.id, points::SHARE_STORY).await?;
    txn.commit().await?;

    tracing::info!(story_id = story.id, author_id = principal.id, "Story shared");

    Ok(ApiResponse::created(StoryResponse::new(story, Some(principal.name))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Success Stories",
    operation_id = "updateStory",
    summary = "Edit a success story",
    description = "Author or admin.",
    params(("id" = i32, Path, description = "Story ID")),
    request_body = UpdateStoryRequest,
    responses(
        (status = 200, description = "Story updated", body = ApiResponse<StoryResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateStoryRequest>,
) -> Result<ApiResponse<StoryResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let (existing, author) = find_story(&state.db, id).await?;
    require_owner_or_admin(&principal, existing.author_id, "story")?;
    validate_update_story(&payload)?;

    let mut active: success_story::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(common::tags::to_json(&tags.normalize()?));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(ApiResponse::ok(StoryResponse::new(updated, author)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Success Stories",
    operation_id = "deleteStory",
    summary = "Delete a success story",
    description = "Author or admin. Points already awarded are kept.",
    params(("id" = i32, Path, description = "Story ID")),
    responses(
        (status = 200, description = "Story deleted", body = ApiResponse<NoData>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let (existing, _) = find_story(&state.db, id).await?;
    require_owner_or_admin(&principal, existing.author_id, "story")?;

    existing.delete(&state.db).await?;

    Ok(ApiResponse::message("Story deleted"))
}

#[utoipa::path(
    post,
    path = "/{id}/feature",
    tag = "Success Stories",
    operation_id = "featureStory",
    summary = "Feature or unfeature a story",
    description = "Admin only.",
    params(("id" = i32, Path, description = "Story ID")),
    request_body = FeatureStoryRequest,
    responses(
        (status = 200, description = "Flag updated", body = ApiResponse<StoryResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, featured = payload.featured))]
pub async fn feature_story(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<FeatureStoryRequest>,
) -> Result<ApiResponse<StoryResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    let (existing, author) = find_story(&state.db, id).await?;
    let mut active: success_story::ActiveModel = existing.into();
    active.is_featured = Set(payload.featured);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    tracing::info!(story_id = id, featured = payload.featured, "Story feature flag changed");

    Ok(ApiResponse::ok(StoryResponse::new(updated, author)))
}
