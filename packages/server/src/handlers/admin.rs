use axum::extract::{Path, State};
use chrono::Utc;
use common::UserRole;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{
    forum, idea, listing, listing_participant, mentorship, success_story, team, user,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::admin::*;
use crate::models::auth::AccountResponse;
use crate::models::shared::{ApiResponse, Paginated, Pagination, escape_like, page_params};
use crate::state::AppState;
use crate::utils::access::{load_principal, require_admin};
use crate::utils::points;

async fn find_user_for_update(txn: &DatabaseTransaction, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Admin",
    operation_id = "adminListUsers",
    summary = "List all users",
    description = "Paginated, newest first. Filters by role, active flag, and a case-insensitive match on name or email. Requires ADMIN.",
    params(AdminUserListQuery),
    responses(
        (status = 200, description = "Page of users", body = ApiResponse<Paginated<AccountResponse>>),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AdminUserListQuery>,
) -> Result<ApiResponse<Paginated<AccountResponse>>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    let (page, per_page) = page_params(query.page, query.per_page);
    let mut select = user::Entity::find();

    if let Some(ref role) = query.role {
        let role: UserRole = role
            .parse()
            .map_err(|e: common::ParseEnumError| AppError::Validation(e.to_string()))?;
        select = select.filter(user::Column::Role.eq(role));
    }
    if let Some(is_active) = query.is_active {
        select = select.filter(user::Column::IsActive.eq(is_active));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim()).to_lowercase();
        if !term.is_empty() {
            let pattern = format!("%{}%", term);
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Name)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(Expr::col(user::Column::Email).like(LikeExpr::new(pattern).escape('\\'))),
            );
        }
    }

    let paginator = select
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let items = paginator
        .fetch_page(page - 1)
        .await?
        .into_iter()
        .map(AccountResponse::from)
        .collect();

    Ok(ApiResponse::ok(Paginated {
        items,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/host-applications",
    tag = "Admin",
    operation_id = "adminListHostApplications",
    summary = "List pending host applications",
    description = "HOST accounts awaiting approval, oldest application first. Requires ADMIN.",
    responses(
        (status = 200, description = "Pending applications", body = ApiResponse<Vec<AccountResponse>>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_host_applications(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<AccountResponse>>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    let pending = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Host))
        .filter(user::Column::IsHostApproved.eq(false))
        .order_by_asc(user::Column::HostAppliedAt)
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(
        pending.into_iter().map(AccountResponse::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/users/{id}/approve-host",
    tag = "Admin",
    operation_id = "adminApproveHost",
    summary = "Approve a host application",
    description = "Only a HOST awaiting approval can be approved. Requires ADMIN.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Host approved", body = ApiResponse<AccountResponse>),
        (status = 400, description = "No pending application (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(target_id = id))]
pub async fn approve_host(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    let txn = state.db.begin().await?;
    let target = find_user_for_update(&txn, id).await?;
    if target.role != UserRole::Host || target.is_host_approved {
        tracing::debug!(role = %target.role, approved = target.is_host_approved, "Approve rejected");
        return Err(AppError::validation("User has no pending host application"));
    }

    let mut active: user::ActiveModel = target.into();
    active.is_host_approved = Set(true);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = id, admin_id = principal.id, "Host approved");

    Ok(ApiResponse::ok(AccountResponse::from(updated)).with_message("Host approved"))
}

#[utoipa::path(
    post,
    path = "/users/{id}/revoke-host",
    tag = "Admin",
    operation_id = "adminRevokeHost",
    summary = "Revoke host status",
    description = "Turns a HOST (approved or pending) back into a USER. Existing listings keep their host. Requires ADMIN.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Host revoked", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Not a host (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(target_id = id))]
pub async fn revoke_host(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    let txn = state.db.begin().await?;
    let target = find_user_for_update(&txn, id).await?;
    if target.role != UserRole::Host {
        return Err(AppError::validation("User is not a host"));
    }

    let mut active: user::ActiveModel = target.into();
    active.role = Set(UserRole::User);
    active.is_host_approved = Set(false);
    active.host_applied_at = Set(None);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = id, admin_id = principal.id, "Host revoked");

    Ok(ApiResponse::ok(AccountResponse::from(updated)).with_message("Host status revoked"))
}

#[utoipa::path(
    patch,
    path = "/users/{id}/status",
    tag = "Admin",
    operation_id = "adminSetUserStatus",
    summary = "Activate or deactivate an account",
    description = "Deactivated accounts cannot log in and are rejected by every authenticated endpoint. Admins cannot deactivate themselves. Requires ADMIN.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = SetUserStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Self-deactivation (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(target_id = id, is_active = payload.is_active))]
pub async fn set_user_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SetUserStatusRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    if id == principal.id && !payload.is_active {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }

    let txn = state.db.begin().await?;
    let target = find_user_for_update(&txn, id).await?;
    let mut active: user::ActiveModel = target.into();
    active.is_active = Set(payload.is_active);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = id,
        admin_id = principal.id,
        is_active = payload.is_active,
        "User status changed"
    );

    Ok(ApiResponse::ok(AccountResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/users/{id}/points",
    tag = "Admin",
    operation_id = "adminAwardPoints",
    summary = "Award or deduct points",
    description = "Adds `points` (which may be negative) to the user's total. The total never drops below zero; the level is recomputed. Requires ADMIN.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = AwardPointsRequest,
    responses(
        (status = 200, description = "Points applied", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(target_id = id, points = payload.points))]
pub async fn award_points(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AwardPointsRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;
    validate_award_points(&payload)?;

    let txn = state.db.begin().await?;
    let updated = points::award(&txn, id, payload.points).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = id,
        admin_id = principal.id,
        delta = payload.points,
        reason = %payload.reason.trim(),
        total = updated.points,
        "Manual points award"
    );

    Ok(ApiResponse::ok(AccountResponse::from(updated)))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Admin",
    operation_id = "adminStats",
    summary = "Platform statistics",
    description = "Row counts for the admin dashboard. Requires ADMIN.",
    responses(
        (status = 200, description = "Counts", body = ApiResponse<StatsResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an admin (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<StatsResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_admin(&principal)?;

    let db = &state.db;
    let data = StatsResponse {
        users: user::Entity::find().count(db).await?,
        hosts: user::Entity::find()
            .filter(user::Column::Role.eq(UserRole::Host))
            .filter(user::Column::IsHostApproved.eq(true))
            .count(db)
            .await?,
        pending_host_applications: user::Entity::find()
            .filter(user::Column::Role.eq(UserRole::Host))
            .filter(user::Column::IsHostApproved.eq(false))
            .count(db)
            .await?,
        listings: listing::Entity::find().count(db).await?,
        registrations: listing_participant::Entity::find().count(db).await?,
        teams: team::Entity::find().count(db).await?,
        forums: forum::Entity::find().count(db).await?,
        ideas: idea::Entity::find().count(db).await?,
        success_stories: success_story::Entity::find().count(db).await?,
        mentorships: mentorship::Entity::find().count(db).await?,
    };

    Ok(ApiResponse::ok(data))
}
