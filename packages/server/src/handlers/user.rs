use axum::extract::{Path, State};
use chrono::Utc;
use common::UserRole;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{listing, listing_participant, team, team_member, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::AccountResponse;
use crate::models::listing::ListingSummary;
use crate::models::shared::ApiResponse;
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::access::{load_principal, require_active};
use crate::utils::listing::participant_counts;

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUserProfile",
    summary = "Get a public profile",
    description = "Public. Email and account flags are never included.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = ApiResponse<PublicProfile>),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<PublicProfile>, AppError> {
    let found = user::Entity::find_by_id(id)
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(ApiResponse::ok(PublicProfile::from(found)))
}

#[utoipa::path(
    patch,
    path = "/me",
    tag = "Users",
    operation_id = "updateMyProfile",
    summary = "Update the caller's profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn update_me(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    validate_update_profile(&payload)?;

    let mut active: user::ActiveModel = principal.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(bio) = payload.bio {
        active.bio = Set(bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()));
    }
    if let Some(skills) = payload.skills {
        active.skills = Set(common::tags::to_json(&skills.normalize()?));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await?;
    Ok(ApiResponse::ok(AccountResponse::from(updated)))
}

#[utoipa::path(
    post,
    path = "/me/host-application",
    tag = "Users",
    operation_id = "applyForHost",
    summary = "Apply to become a host",
    description = "Only a USER may apply. The account becomes a HOST awaiting admin approval and cannot create listings until approved.",
    responses(
        (status = 200, description = "Application recorded", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Already a host or admin (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn apply_for_host(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let txn = state.db.begin().await?;
    let principal = user::Entity::find_by_id(auth_user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::TokenInvalid)?;
    require_active(&principal)?;

    if principal.role != UserRole::User {
        tracing::debug!(role = %principal.role, "Host application rejected");
        return Err(AppError::validation(match principal.role {
            UserRole::Host if !principal.is_host_approved => "Host application already pending",
            _ => "Already a host or admin",
        }));
    }

    let now = Utc::now();
    let mut active: user::ActiveModel = principal.into();
    active.role = Set(UserRole::Host);
    active.is_host_approved = Set(false);
    active.host_applied_at = Set(Some(now));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = updated.id, "Host application submitted");

    Ok(ApiResponse::ok(AccountResponse::from(updated))
        .with_message("Host application submitted"))
}

#[utoipa::path(
    get,
    path = "/me/registrations",
    tag = "Users",
    operation_id = "listMyRegistrations",
    summary = "List the caller's registrations",
    description = "Listings of every kind the caller is registered for, most recent registration first.",
    responses(
        (status = 200, description = "Registrations", body = ApiResponse<Vec<RegistrationItem>>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<RegistrationItem>>, AppError> {
    let rows = listing_participant::Entity::find()
        .filter(listing_participant::Column::UserId.eq(auth_user.user_id))
        .order_by_desc(listing_participant::Column::RegisteredAt)
        .find_also_related(listing::Entity)
        .all(&state.db)
        .await?;

    let ids = rows.iter().map(|(p, _)| p.listing_id).collect();
    let counts = participant_counts(&state.db, ids).await?;

    let data = rows
        .into_iter()
        .filter_map(|(p, l)| {
            l.map(|l| {
                let count = counts.get(&l.id).copied().unwrap_or(0);
                RegistrationItem {
                    listing: ListingSummary::new(l, count),
                    registered_at: p.registered_at,
                }
            })
        })
        .collect();

    Ok(ApiResponse::ok(data))
}

#[utoipa::path(
    get,
    path = "/me/teams",
    tag = "Users",
    operation_id = "listMyTeams",
    summary = "List the caller's teams",
    responses(
        (status = 200, description = "Teams", body = ApiResponse<Vec<MyTeamItem>>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_teams(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<MyTeamItem>>, AppError> {
    let rows = team_member::Entity::find()
        .filter(team_member::Column::UserId.eq(auth_user.user_id))
        .order_by_desc(team_member::Column::JoinedAt)
        .find_also_related(team::Entity)
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .filter_map(|(m, t)| {
            t.map(|t| MyTeamItem {
                team_id: t.id,
                team_name: t.name,
                listing_id: t.listing_id,
                role: m.role,
                joined_at: m.joined_at,
            })
        })
        .collect();

    Ok(ApiResponse::ok(data))
}
