use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{forum, forum_reply, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::forum::*;
use crate::models::shared::{
    ApiResponse, NoData, Paginated, Pagination, escape_like, json_tag_filter, page_params,
};
use crate::state::AppState;
use crate::utils::access::{load_principal, require_owner_or_admin};
use crate::utils::points;

async fn find_forum<C: ConnectionTrait>(db: &C, id: i32) -> Result<forum::Model, AppError> {
    forum::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Thread not found"))
}

async fn author_names<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<HashMap<i32, String>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, String)> = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Name)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn reply_counts<C: ConnectionTrait>(
    db: &C,
    forum_ids: Vec<i32>,
) -> Result<HashMap<i32, u64>, AppError> {
    if forum_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = forum_reply::Entity::find()
        .filter(forum_reply::Column::ForumId.is_in(forum_ids))
        .select_only()
        .column(forum_reply::Column::ForumId)
        .column_as(forum_reply::Column::Id.count(), "count")
        .group_by(forum_reply::Column::ForumId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, std::cmp::Ord::max(count, 0) as u64))
        .collect())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Forums",
    operation_id = "listForums",
    summary = "List discussion threads",
    description = "Public. Pinned threads first, then newest. Filters by category, tag, and a case-insensitive match on title or content.",
    params(ForumListQuery),
    responses(
        (status = 200, description = "Page of threads", body = ApiResponse<Paginated<ForumSummary>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_forums(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ForumListQuery>,
) -> Result<ApiResponse<Paginated<ForumSummary>>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let mut select = forum::Entity::find();

    if let Some(ref category) = query.category {
        select = select.filter(forum::Column::Category.eq(normalize_category(Some(category))?));
    }
    if let Some(ref tag) = query.tag {
        let tag = tag.trim();
        if !tag.is_empty() {
            select = select.filter(json_tag_filter("forum", "tags", tag));
        }
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim()).to_lowercase();
        if !term.is_empty() {
            let pattern = format!("%{}%", term);
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(forum::Column::Title)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(forum::Column::Content)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let total = select.clone().count(&state.db).await?;
    let threads = select
        .order_by_desc(forum::Column::IsPinned)
        .order_by_desc(forum::Column::CreatedAt)
        .order_by_desc(forum::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let names = author_names(&state.db, threads.iter().map(|f| f.author_id).collect()).await?;
    let counts = reply_counts(&state.db, threads.iter().map(|f| f.id).collect()).await?;

    let items = threads
        .into_iter()
        .map(|f| {
            let name = names.get(&f.author_id).cloned();
            let count = counts.get(&f.id).copied().unwrap_or(0);
            ForumSummary::new(f, name, count)
        })
        .collect();

    Ok(ApiResponse::ok(Paginated {
        items,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Forums",
    operation_id = "createForum",
    summary = "Start a discussion thread",
    description = "Any active user. Awards the author 5 points.",
    request_body = CreateForumRequest,
    responses(
        (status = 201, description = "Thread created", body = ApiResponse<ForumSummary>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account deactivated (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_forum(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateForumRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    validate_create_forum(&payload)?;
    let category = normalize_category(payload.category.as_deref())?;
    let tags = payload.tags.normalize()?;

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let model = forum::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        content: Set(payload.content),
        category: Set(category),
        tags: Set(common::tags::to_json(&tags)),
        author_id: Set(principal.id),
        views: Set(0),
        is_pinned: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    points::award(&txn, principal.id, points::CREATE_FORUM).await?;
    txn.commit().await?;

    tracing::info!(forum_id = model.id, author_id = principal.id, "Thread created");

    Ok(ApiResponse::created(ForumSummary::new(model, Some(principal.name), 0)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Forums",
    operation_id = "getForum",
    summary = "Read a thread",
    description = "Public. Returns the thread with all replies and counts the view.",
    params(("id" = i32, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread detail", body = ApiResponse<ForumDetail>),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_forum(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<ForumDetail>, AppError> {
    let bumped = forum::Entity::update_many()
        .col_expr(forum::Column::Views, Expr::col(forum::Column::Views).add(1))
        .filter(forum::Column::Id.eq(id))
        .exec(&state.db)
        .await?;
    if bumped.rows_affected == 0 {
        return Err(AppError::not_found("Thread not found"));
    }

    let thread = find_forum(&state.db, id).await?;
    let replies = forum_reply::Entity::find()
        .filter(forum_reply::Column::ForumId.eq(id))
        .order_by_asc(forum_reply::Column::CreatedAt)
        .order_by_asc(forum_reply::Column::Id)
        .all(&state.db)
        .await?;

    let mut ids: Vec<i32> = replies.iter().map(|r| r.author_id).collect();
    ids.push(thread.author_id);
    ids.sort_unstable();
    ids.dedup();
    let names = author_names(&state.db, ids).await?;

    let content = thread.content.clone();
    let author_name = names.get(&thread.author_id).cloned();
    let reply_count = replies.len() as u64;
    let replies = replies
        .into_iter()
        .map(|r| {
            let name = names.get(&r.author_id).cloned();
            ReplyResponse::new(r, name)
        })
        .collect();

    Ok(ApiResponse::ok(ForumDetail {
        summary: ForumSummary::new(thread, author_name, reply_count),
        content,
        replies,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Forums",
    operation_id = "updateForum",
    summary = "Edit a thread",
    description = "Author or admin. Only admins may change `is_pinned`.",
    params(("id" = i32, Path, description = "Thread ID")),
    request_body = UpdateForumRequest,
    responses(
        (status = 200, description = "Thread updated", body = ApiResponse<ForumSummary>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author, or pinning as non-admin (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_forum(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateForumRequest>,
) -> Result<ApiResponse<ForumSummary>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let existing = find_forum(&state.db, id).await?;
    require_owner_or_admin(&principal, existing.author_id, "thread")?;
    if payload.is_pinned.is_some() && !principal.role.is_admin() {
        return Err(AppError::forbidden("Only admins can pin threads"));
    }
    validate_update_forum(&payload)?;

    let mut active: forum::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    if let Some(ref category) = payload.category {
        active.category = Set(normalize_category(Some(category))?);
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(common::tags::to_json(&tags.normalize()?));
    }
    if let Some(is_pinned) = payload.is_pinned {
        active.is_pinned = Set(is_pinned);
    }
    active.updated_at = Set(Utc::now());
    let model = active.update(&state.db).await?;

    let names = author_names(&state.db, vec![model.author_id]).await?;
    let counts = reply_counts(&state.db, vec![model.id]).await?;
    let name = names.get(&model.author_id).cloned();
    let count = counts.get(&model.id).copied().unwrap_or(0);

    Ok(ApiResponse::ok(ForumSummary::new(model, name, count)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Forums",
    operation_id = "deleteForum",
    summary = "Delete a thread",
    description = "Author or admin. Deletes all replies too.",
    params(("id" = i32, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread deleted", body = ApiResponse<NoData>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_forum(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = find_forum(&txn, id).await?;
    require_owner_or_admin(&principal, existing.author_id, "thread")?;

    let removed = forum_reply::Entity::delete_many()
        .filter(forum_reply::Column::ForumId.eq(id))
        .exec(&txn)
        .await?;
    forum::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(forum_id = id, replies = removed.rows_affected, "Thread deleted");

    Ok(ApiResponse::message("Thread deleted"))
}

#[utoipa::path(
    post,
    path = "/{id}/replies",
    tag = "Forums",
    operation_id = "createReply",
    summary = "Reply to a thread",
    description = "Any active user. Awards the author 2 points.",
    params(("id" = i32, Path, description = "Thread ID")),
    request_body = CreateReplyRequest,
    responses(
        (status = 201, description = "Reply posted", body = ApiResponse<ReplyResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Thread not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(forum_id))]
pub async fn create_reply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(forum_id): Path<i32>,
    AppJson(payload): AppJson<CreateReplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    validate_reply(&payload)?;

    let txn = state.db.begin().await?;
    find_forum(&txn, forum_id).await?;

    let now = Utc::now();
    let reply = forum_reply::ActiveModel {
        forum_id: Set(forum_id),
        author_id: Set(principal.id),
        content: Set(payload.content),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    points::award(&txn, principal.id, points::CREATE_REPLY).await?;
    txn.commit().await?;

    Ok(ApiResponse::created(ReplyResponse::new(reply, Some(principal.name))))
}

#[utoipa::path(
    delete,
    path = "/{id}/replies/{reply_id}",
    tag = "Forums",
    operation_id = "deleteReply",
    summary = "Delete a reply",
    description = "Reply author or admin.",
    params(
        ("id" = i32, Path, description = "Thread ID"),
        ("reply_id" = i32, Path, description = "Reply ID"),
    ),
    responses(
        (status = 200, description = "Reply deleted", body = ApiResponse<NoData>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(forum_id, reply_id))]
pub async fn delete_reply(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((forum_id, reply_id)): Path<(i32, i32)>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let reply = forum_reply::Entity::find_by_id(reply_id)
        .filter(forum_reply::Column::ForumId.eq(forum_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Reply not found"))?;
    require_owner_or_admin(&principal, reply.author_id, "reply")?;

    reply.delete(&state.db).await?;

    Ok(ApiResponse::message("Reply deleted"))
}
