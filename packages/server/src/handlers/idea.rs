use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{idea, idea_vote, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::idea::*;
use crate::models::shared::{
    ApiResponse, NoData, Paginated, Pagination, escape_like, page_params, sort_order,
};
use crate::state::AppState;
use crate::utils::access::{load_principal, require_owner_or_admin};
use crate::utils::points;

async fn find_idea<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<(idea::Model, Option<String>), AppError> {
    let (found, author) = idea::Entity::find_by_id(id)
        .find_also_related(user::Entity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Idea not found"))?;
    Ok((found, author.map(|u| u.name)))
}

async fn find_idea_for_update(txn: &DatabaseTransaction, id: i32) -> Result<idea::Model, AppError> {
    idea::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Idea not found"))
}

async fn has_voted<C: ConnectionTrait>(db: &C, idea_id: i32, user_id: i32) -> Result<bool, AppError> {
    Ok(idea_vote::Entity::find_by_id((idea_id, user_id))
        .one(db)
        .await?
        .is_some())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Ideas",
    operation_id = "listIdeas",
    summary = "List project ideas",
    description = "Public. Filters by category and a case-insensitive match on title or description. Sorted by `created_at` (default) or `votes`, descending unless `sort_order=asc`.",
    params(IdeaListQuery),
    responses(
        (status = 200, description = "Page of ideas", body = ApiResponse<Paginated<IdeaResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_ideas(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<IdeaListQuery>,
) -> Result<ApiResponse<Paginated<IdeaResponse>>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let mut select = idea::Entity::find();

    if let Some(category) = normalize_category(query.category.as_deref())? {
        select = select.filter(idea::Column::Category.eq(category));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim()).to_lowercase();
        if !term.is_empty() {
            let pattern = format!("%{}%", term);
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(idea::Column::Title)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(idea::Column::Description)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let sort_column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => idea::Column::CreatedAt,
        "votes" => idea::Column::Votes,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, votes".into(),
            ));
        }
    };
    let order = sort_order(query.sort_order.as_deref(), Order::Desc)?;

    let total = select.clone().count(&state.db).await?;
    let rows = select
        .order_by(sort_column, order)
        .order_by_desc(idea::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let voted: HashSet<i32> = match auth_user {
        Some(ref u) if !rows.is_empty() => idea_vote::Entity::find()
            .filter(idea_vote::Column::UserId.eq(u.user_id))
            .filter(idea_vote::Column::IdeaId.is_in(rows.iter().map(|(i, _)| i.id)))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|v| v.idea_id)
            .collect(),
        _ => HashSet::new(),
    };

    let items = rows
        .into_iter()
        .map(|(i, u)| {
            let voted = voted.contains(&i.id);
            IdeaResponse::new(i, u.map(|u| u.name), voted)
        })
        .collect();

    Ok(ApiResponse::ok(Paginated {
        items,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Ideas",
    operation_id = "getIdea",
    summary = "Get an idea",
    params(("id" = i32, Path, description = "Idea ID")),
    responses(
        (status = 200, description = "Idea", body = ApiResponse<IdeaResponse>),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_idea(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<IdeaResponse>, AppError> {
    let (found, author) = find_idea(&state.db, id).await?;
    let voted = match auth_user {
        Some(ref u) => has_voted(&state.db, id, u.user_id).await?,
        None => false,
    };
    Ok(ApiResponse::ok(IdeaResponse::new(found, author, voted)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Ideas",
    operation_id = "createIdea",
    summary = "Post a project idea",
    description = "Any active user. Awards the author 5 points.",
    request_body = CreateIdeaRequest,
    responses(
        (status = 201, description = "Idea posted", body = ApiResponse<IdeaResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_idea(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateIdeaRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    validate_create_idea(&payload)?;
    let tech_stack = payload.tech_stack.normalize()?;
    let category = normalize_category(payload.category.as_deref())?;

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let created = idea::ActiveModel {
        author_id: Set(principal.id),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        tech_stack: Set(common::tags::to_json(&tech_stack)),
        category: Set(category),
        votes: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    points::award(&txn, principal.id, points::POST_IDEA).await?;
    txn.commit().await?;

    tracing::info!(idea_id = created.id, author_id = principal.id, "Idea posted");

    Ok(ApiResponse::created(IdeaResponse::new(created, Some(principal.name), false)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Ideas",
    operation_id = "updateIdea",
    summary = "Edit an idea",
    description = "Author or admin. `category: null` clears the category.",
    params(("id" = i32, Path, description = "Idea ID")),
    request_body = UpdateIdeaRequest,
    responses(
        (status = 200, description = "Idea updated", body = ApiResponse<IdeaResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_idea(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateIdeaRequest>,
) -> Result<ApiResponse<IdeaResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let (existing, author) = find_idea(&state.db, id).await?;
    require_owner_or_admin(&principal, existing.author_id, "idea")?;
    validate_update_idea(&payload)?;

    let mut active: idea::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(tech_stack) = payload.tech_stack {
        active.tech_stack = Set(common::tags::to_json(&tech_stack.normalize()?));
    }
    if let Some(category) = payload.category {
        active.category = Set(normalize_category(category.as_deref())?);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    let voted = has_voted(&state.db, id, principal.id).await?;
    Ok(ApiResponse::ok(IdeaResponse::new(updated, author, voted)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Ideas",
    operation_id = "deleteIdea",
    summary = "Delete an idea",
    description = "Author or admin. Removes its votes too.",
    params(("id" = i32, Path, description = "Idea ID")),
    responses(
        (status = 200, description = "Idea deleted", body = ApiResponse<NoData>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_idea(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = find_idea_for_update(&txn, id).await?;
    require_owner_or_admin(&principal, existing.author_id, "idea")?;

    idea_vote::Entity::delete_many()
        .filter(idea_vote::Column::IdeaId.eq(id))
        .exec(&txn)
        .await?;
    idea::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(idea_id = id, user_id = principal.id, "Idea deleted");

    Ok(ApiResponse::message("Idea deleted"))
}

#[utoipa::path(
    post,
    path = "/{id}/vote",
    tag = "Ideas",
    operation_id = "voteIdea",
    summary = "Vote for an idea",
    description = "One vote per user. Authors cannot vote on their own ideas.",
    params(("id" = i32, Path, description = "Idea ID")),
    responses(
        (status = 201, description = "Vote recorded", body = ApiResponse<VoteResponse>),
        (status = 400, description = "Own idea or already voted (VALIDATION_ERROR, ALREADY_REGISTERED)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(idea_id))]
pub async fn vote_idea(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(idea_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let target = find_idea_for_update(&txn, idea_id).await?;
    if target.author_id == principal.id {
        return Err(AppError::validation("You cannot vote on your own idea"));
    }
    if has_voted(&txn, idea_id, principal.id).await? {
        return Err(AppError::AlreadyRegistered("Already voted".into()));
    }

    idea_vote::ActiveModel {
        idea_id: Set(idea_id),
        user_id: Set(principal.id),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::AlreadyRegistered("Already voted".into())
        }
        _ => AppError::from(e),
    })?;

    let votes = target.votes.saturating_add(1);
    let mut active: idea::ActiveModel = target.into();
    active.votes = Set(votes);
    active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::created(VoteResponse {
        idea_id,
        votes,
        has_voted: true,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}/vote",
    tag = "Ideas",
    operation_id = "unvoteIdea",
    summary = "Retract a vote",
    params(("id" = i32, Path, description = "Idea ID")),
    responses(
        (status = 200, description = "Vote retracted", body = ApiResponse<VoteResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not voted or not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(idea_id))]
pub async fn unvote_idea(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(idea_id): Path<i32>,
) -> Result<ApiResponse<VoteResponse>, AppError> {
    let txn = state.db.begin().await?;
    let target = find_idea_for_update(&txn, idea_id).await?;

    let removed = idea_vote::Entity::delete_by_id((idea_id, auth_user.user_id))
        .exec(&txn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(AppError::not_found("You have not voted on this idea"));
    }

    let votes = std::cmp::Ord::max(target.votes - 1, 0);
    let mut active: idea::ActiveModel = target.into();
    active.votes = Set(votes);
    active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::ok(VoteResponse {
        idea_id,
        votes,
        has_voted: false,
    }))
}
