use axum::Extension;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use common::{ListingKind, MemberRole};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{team, team_member, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{ApiResponse, NoData};
use crate::models::team::*;
use crate::state::AppState;
use crate::utils::access::load_principal;
use crate::utils::listing::{find_listing, find_listing_for_update, is_participant};
use crate::utils::team::{
    find_team, has_room, lock_team, member_count, member_counts,
    membership_in_listing, require_leader_or_admin,
};

fn name_taken(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A team with this name already exists for this listing".into())
        }
        _ => AppError::from(e),
    }
}

async fn name_exists<C: ConnectionTrait>(
    db: &C,
    listing_id: i32,
    name: &str,
    except: Option<i32>,
) -> Result<bool, AppError> {
    let mut select = team::Entity::find()
        .filter(team::Column::ListingId.eq(listing_id))
        .filter(team::Column::Name.eq(name));
    if let Some(id) = except {
        select = select.filter(team::Column::Id.ne(id));
    }
    Ok(select.one(db).await?.is_some())
}

async fn load_members<C: ConnectionTrait>(
    db: &C,
    team_id: i32,
) -> Result<Vec<TeamMemberResponse>, AppError> {
    let rows = team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .order_by_asc(team_member::Column::JoinedAt)
        .find_also_related(user::Entity)
        .all(db)
        .await?;

    let mut members: Vec<TeamMemberResponse> = rows
        .into_iter()
        .filter_map(|(m, u)| {
            u.map(|u| TeamMemberResponse {
                user_id: m.user_id,
                name: u.name,
                role: m.role,
                joined_at: m.joined_at,
            })
        })
        .collect();
    // Stable sort keeps join order within each role.
    members.sort_by_key(|m| m.role != MemberRole::Leader);
    Ok(members)
}

#[utoipa::path(
    get,
    path = "/{id}/teams",
    tag = "Teams",
    operation_id = "listListingTeams",
    summary = "List the teams of a listing",
    description = "Public. Teams are ordered by creation time and include their member counts.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Teams", body = ApiResponse<Vec<TeamResponse>>),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(kind = %kind, listing_id))]
pub async fn list_teams(
    Extension(kind): Extension<ListingKind>,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
) -> Result<ApiResponse<Vec<TeamResponse>>, AppError> {
    find_listing(&state.db, kind, listing_id).await?;

    let teams = team::Entity::find()
        .filter(team::Column::ListingId.eq(listing_id))
        .order_by_asc(team::Column::CreatedAt)
        .order_by_asc(team::Column::Id)
        .all(&state.db)
        .await?;

    let counts = member_counts(&state.db, teams.iter().map(|t| t.id).collect()).await?;
    let data = teams
        .into_iter()
        .map(|t| {
            let count = counts.get(&t.id).copied().unwrap_or(0);
            TeamResponse::new(t, count)
        })
        .collect();

    Ok(ApiResponse::ok(data))
}

#[utoipa::path(
    post,
    path = "/{id}/teams",
    tag = "Teams",
    operation_id = "createTeam",
    summary = "Create a team for a listing",
    description = "The caller must be registered for the listing, or be its host or an admin. The caller becomes the team leader and may belong to only one team per listing. Team names are unique per listing.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = ApiResponse<TeamDetailResponse>),
        (status = 400, description = "Validation error or already in a team (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not registered for the listing (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Listing not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(kind = %kind, listing_id))]
pub async fn create_team(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
    AppJson(payload): AppJson<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let parent = find_listing_for_update(&txn, kind, listing_id).await?;

    let privileged = parent.host_id == principal.id || principal.role.is_admin();
    if !privileged && !is_participant(&txn, listing_id, principal.id).await? {
        return Err(AppError::forbidden(format!(
            "Register for this {} before creating a team",
            kind.label().to_lowercase()
        )));
    }
    validate_create_team(&payload)?;
    let looking_for = payload.looking_for.normalize()?;

    if membership_in_listing(&txn, listing_id, principal.id)
        .await?
        .is_some()
    {
        return Err(AppError::validation(
            "You already belong to a team for this listing",
        ));
    }

    let name = payload.name.trim().to_string();
    if name_exists(&txn, listing_id, &name, None).await? {
        return Err(AppError::Conflict(
            "A team with this name already exists for this listing".into(),
        ));
    }

    let now = Utc::now();
    let created = team::ActiveModel {
        listing_id: Set(listing_id),
        name: Set(name),
        description: Set(payload.description.trim().to_string()),
        leader_id: Set(principal.id),
        max_members: Set(payload.max_members.unwrap_or(DEFAULT_MAX_MEMBERS)),
        looking_for: Set(common::tags::to_json(&looking_for)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(name_taken)?;

    team_member::ActiveModel {
        team_id: Set(created.id),
        user_id: Set(principal.id),
        role: Set(MemberRole::Leader),
        joined_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let members = load_members(&txn, created.id).await?;
    txn.commit().await?;

    tracing::info!(team_id = created.id, listing_id, leader_id = principal.id, "Team created");

    Ok(ApiResponse::created(TeamDetailResponse {
        team: TeamResponse::new(created, 1),
        members,
    })
    .with_message("Team created"))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Teams",
    operation_id = "getTeam",
    summary = "Get a team with its members",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team detail", body = ApiResponse<TeamDetailResponse>),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<TeamDetailResponse>, AppError> {
    let found = find_team(&state.db, id).await?;
    let members = load_members(&state.db, id).await?;
    let count = members.len() as u64;
    Ok(ApiResponse::ok(TeamDetailResponse {
        team: TeamResponse::new(found, count),
        members,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Teams",
    operation_id = "updateTeam",
    summary = "Update a team",
    description = "Leader or admin only. `max_members` cannot drop below the current roster size.",
    params(("id" = i32, Path, description = "Team ID")),
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team updated", body = ApiResponse<TeamResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the leader (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTeamRequest>,
) -> Result<ApiResponse<TeamResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = lock_team(&txn, id).await?;
    require_leader_or_admin(&principal, &existing)?;
    validate_update_team(&payload)?;

    let count = member_count(&txn, id).await?;
    if let Some(max) = payload.max_members
        && (max as u64) < count
    {
        return Err(AppError::Validation(format!(
            "max_members cannot be lower than the current {count} members"
        )));
    }

    let listing_id = existing.listing_id;
    let mut active: team::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        let name = name.trim().to_string();
        if name_exists(&txn, listing_id, &name, Some(id)).await? {
            return Err(AppError::Conflict(
                "A team with this name already exists for this listing".into(),
            ));
        }
        active.name = Set(name);
    }
    if let Some(ref description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(max) = payload.max_members {
        active.max_members = Set(max);
    }
    if let Some(looking_for) = payload.looking_for {
        active.looking_for = Set(common::tags::to_json(&looking_for.normalize()?));
    }
    active.updated_at = Set(Utc::now());

    let model = active.update(&txn).await.map_err(name_taken)?;
    txn.commit().await?;

    Ok(ApiResponse::ok(TeamResponse::new(model, count)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Teams",
    operation_id = "deleteTeam",
    summary = "Disband a team",
    description = "Leader or admin only. Removes every membership.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team deleted", body = ApiResponse<NoData>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the leader (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = lock_team(&txn, id).await?;
    require_leader_or_admin(&principal, &existing)?;

    let removed = team_member::Entity::delete_many()
        .filter(team_member::Column::TeamId.eq(id))
        .exec(&txn)
        .await?;
    team::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(team_id = id, members = removed.rows_affected, "Team deleted");

    Ok(ApiResponse::message("Team deleted"))
}

#[utoipa::path(
    post,
    path = "/{id}/join",
    tag = "Teams",
    operation_id = "joinTeam",
    summary = "Join a team",
    description = "The caller must be registered for the team's listing and not already be in a team for it.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 201, description = "Joined", body = ApiResponse<TeamMemberResponse>),
        (status = 400, description = "Full, duplicate, or in another team (CAPACITY_REACHED, ALREADY_REGISTERED, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not registered for the listing (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id))]
pub async fn join_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(team_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let target = lock_team(&txn, team_id).await?;
    let listing_id = target.listing_id;

    if !is_participant(&txn, listing_id, principal.id).await? {
        return Err(AppError::forbidden(
            "Register for the listing before joining a team",
        ));
    }
    if let Some(existing) = membership_in_listing(&txn, listing_id, principal.id).await? {
        if existing.team_id == team_id {
            return Err(AppError::AlreadyRegistered("Already a member".into()));
        }
        return Err(AppError::validation(
            "You already belong to another team for this listing",
        ));
    }
    let count = member_count(&txn, team_id).await?;
    if !has_room(target.max_members, count) {
        return Err(AppError::CapacityReached("Team is full".into()));
    }

    let row = team_member::ActiveModel {
        team_id: Set(team_id),
        user_id: Set(principal.id),
        role: Set(MemberRole::Member),
        joined_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::AlreadyRegistered("Already a member".into())
        }
        _ => AppError::from(e),
    })?;
    txn.commit().await?;

    tracing::info!(team_id, user_id = principal.id, "Joined team");

    Ok(ApiResponse::created(TeamMemberResponse {
        user_id: row.user_id,
        name: principal.name,
        role: row.role,
        joined_at: row.joined_at,
    })
    .with_message("Joined team"))
}

#[utoipa::path(
    post,
    path = "/{id}/leave",
    tag = "Teams",
    operation_id = "leaveTeam",
    summary = "Leave a team",
    description = "The leader cannot leave while other members remain. A leader who is the last member disbands the team by leaving.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Left the team", body = ApiResponse<NoData>),
        (status = 400, description = "Leader with remaining members (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not a member or not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id))]
pub async fn leave_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(team_id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let txn = state.db.begin().await?;
    let target = lock_team(&txn, team_id).await?;

    let membership = team_member::Entity::find_by_id((team_id, auth_user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("You are not a member of this team"))?;

    if target.leader_id == auth_user.user_id {
        let count = member_count(&txn, team_id).await?;
        if count > 1 {
            return Err(AppError::validation(
                "Remove the other members before leaving as leader",
            ));
        }
        membership.delete(&txn).await?;
        team::Entity::delete_by_id(team_id).exec(&txn).await?;
        txn.commit().await?;

        tracing::info!(team_id, user_id = auth_user.user_id, "Last member left, team disbanded");
        return Ok(ApiResponse::message("Left team; the team was disbanded"));
    }

    membership.delete(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::message("Left team"))
}

#[utoipa::path(
    delete,
    path = "/{id}/members/{user_id}",
    tag = "Teams",
    operation_id = "removeTeamMember",
    summary = "Remove a member",
    description = "Leader or admin only. The leader cannot be removed.",
    params(
        ("id" = i32, Path, description = "Team ID"),
        ("user_id" = i32, Path, description = "User ID of the member"),
    ),
    responses(
        (status = 200, description = "Member removed", body = ApiResponse<NoData>),
        (status = 400, description = "Target is the leader (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the leader (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not a member or not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id, user_id))]
pub async fn remove_member(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((team_id, user_id)): Path<(i32, i32)>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let target = lock_team(&txn, team_id).await?;
    require_leader_or_admin(&principal, &target)?;

    if target.leader_id == user_id {
        return Err(AppError::validation("The team leader cannot be removed"));
    }

    let result = team_member::Entity::delete_by_id((team_id, user_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("User is not a member of this team"));
    }
    txn.commit().await?;

    tracing::info!(team_id, user_id, removed_by = principal.id, "Team member removed");

    Ok(ApiResponse::message("Member removed"))
}
