use axum::Extension;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use common::ListingKind;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{listing, listing_participant, team, team_member, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::listing::*;
use crate::models::shared::{
    ApiResponse, NoData, Paginated, Pagination, escape_like, json_tag_filter, page_params,
    sort_order,
};
use crate::state::AppState;
use crate::utils::access::{load_principal, require_host, require_owner_or_admin};
use crate::utils::listing::{
    find_listing, find_listing_for_update, has_capacity, is_participant, participant_count,
    participant_counts, registration_open,
};
use crate::utils::points;

#[utoipa::path(
    get,
    path = "/",
    tag = "Listings",
    operation_id = "listListings",
    summary = "List listings of one kind",
    description = "Public, paginated list of hackathons, events, courses, etc. (the kind is fixed by the URL prefix). Supports case-insensitive title search, tag and timeline filters, and sorting by `start_date` (default, ascending), `created_at` or `title`.",
    params(ListingListQuery),
    responses(
        (status = 200, description = "Page of listings", body = ApiResponse<Paginated<ListingSummary>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(kind = %kind))]
pub async fn list_listings(
    Extension(kind): Extension<ListingKind>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListingListQuery>,
) -> Result<ApiResponse<Paginated<ListingSummary>>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = listing::Entity::find().filter(listing::Column::Kind.eq(kind));

    if let Some(host_id) = query.host_id {
        select = select.filter(listing::Column::HostId.eq(host_id));
    }

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(listing::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    if let Some(ref tag) = query.tag {
        let tag = tag.trim();
        if !tag.is_empty() {
            select = select.filter(json_tag_filter("listing", "tags", tag));
        }
    }

    let now = Utc::now();
    match query.status.as_deref() {
        None => {}
        Some("upcoming") => select = select.filter(listing::Column::StartDate.gt(now)),
        Some("ongoing") => {
            select = select
                .filter(listing::Column::StartDate.lte(now))
                .filter(listing::Column::EndDate.gt(now))
        }
        Some("past") => select = select.filter(listing::Column::EndDate.lte(now)),
        Some(_) => {
            return Err(AppError::Validation(
                "status must be one of: upcoming, ongoing, past".into(),
            ));
        }
    }

    let (sort_column, default_order) = match query.sort_by.as_deref().unwrap_or("start_date") {
        "start_date" => (listing::Column::StartDate, Order::Asc),
        "created_at" => (listing::Column::CreatedAt, Order::Desc),
        "title" => (listing::Column::Title, Order::Asc),
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: start_date, created_at, title".into(),
            ));
        }
    };
    let order = sort_order(query.sort_order.as_deref(), default_order)?;

    let total = select.clone().count(&state.db).await?;

    let models = select
        .order_by(sort_column, order)
        .order_by_asc(listing::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let counts = participant_counts(&state.db, models.iter().map(|m| m.id).collect()).await?;
    let items = models
        .into_iter()
        .map(|m| {
            let count = counts.get(&m.id).copied().unwrap_or(0);
            ListingSummary::new(m, count)
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
    tag = "Listings",
    operation_id = "getListing",
    summary = "Get a listing by ID",
    description = "Public. Includes the participant count, the derived timeline status, and whether the caller (if authenticated) is registered. A listing of another kind is reported as not found.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing detail", body = ApiResponse<ListingResponse>),
        (status = 401, description = "Malformed token (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(kind = %kind, id))]
pub async fn get_listing(
    Extension(kind): Extension<ListingKind>,
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<ListingResponse>, AppError> {
    let model = find_listing(&state.db, kind, id).await?;
    let count = participant_count(&state.db, id).await?;
    let registered = match auth_user {
        Some(ref u) => is_participant(&state.db, id, u.user_id).await?,
        None => false,
    };
    Ok(ApiResponse::ok(ListingResponse::new(model, count, registered)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Listings",
    operation_id = "createListing",
    summary = "Create a listing",
    description = "Requires an approved HOST or an ADMIN. The caller becomes the owning host.",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Listing created", body = ApiResponse<ListingResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not an approved host (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(kind = %kind, title = %payload.title))]
pub async fn create_listing(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateListingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    require_host(&principal, kind.plural())?;
    validate_create_listing(&payload)?;
    let tags = payload.tags.normalize()?;

    let now = Utc::now();
    let new_listing = listing::ActiveModel {
        kind: Set(kind),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        location: Set(payload.location.map(|s| s.trim().to_string())),
        is_online: Set(payload.is_online),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        registration_deadline: Set(payload.registration_deadline),
        max_participants: Set(payload.max_participants),
        tags: Set(common::tags::to_json(&tags)),
        prize_pool: Set(payload.prize_pool),
        difficulty: Set(payload.difficulty),
        image_url: Set(payload.image_url),
        host_id: Set(principal.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_listing.insert(&state.db).await?;

    tracing::info!(listing_id = model.id, host_id = principal.id, "Listing created");

    Ok(ApiResponse::created(ListingResponse::new(model, 0, false))
        .with_message(format!("{} created", kind.label())))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Listings",
    operation_id = "updateListing",
    summary = "Update a listing",
    description = "Owner host or admin only. PATCH semantics; nullable fields accept `null`. Date rules are checked against stored values, and capacity cannot drop below the current participant count.",
    params(("id" = i32, Path, description = "Listing ID")),
    request_body = UpdateListingRequest,
    responses(
        (status = 200, description = "Listing updated", body = ApiResponse<ListingResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(kind = %kind, id))]
pub async fn update_listing(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateListingRequest>,
) -> Result<ApiResponse<ListingResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = find_listing_for_update(&txn, kind, id).await?;
    require_owner_or_admin(&principal, existing.host_id, &kind.label().to_lowercase())?;
    validate_update_listing(&payload)?;

    let start = payload.start_date.unwrap_or(existing.start_date);
    let end = payload.end_date.unwrap_or(existing.end_date);
    let deadline = payload
        .registration_deadline
        .unwrap_or(existing.registration_deadline);
    validate_dates(start, end, deadline)?;

    let count = participant_count(&txn, id).await?;
    if let Some(Some(max)) = payload.max_participants
        && (max as u64) < count
    {
        return Err(AppError::Validation(format!(
            "max_participants cannot be lower than the current {count} participants"
        )));
    }

    let mut active: listing::ActiveModel = existing.into();

    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(location) = payload.location {
        active.location = Set(location.map(|s| s.trim().to_string()));
    }
    if let Some(is_online) = payload.is_online {
        active.is_online = Set(is_online);
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(start_date);
    }
    if let Some(end_date) = payload.end_date {
        active.end_date = Set(end_date);
    }
    if let Some(deadline) = payload.registration_deadline {
        active.registration_deadline = Set(deadline);
    }
    if let Some(max) = payload.max_participants {
        active.max_participants = Set(max);
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(common::tags::to_json(&tags.normalize()?));
    }
    if let Some(prize_pool) = payload.prize_pool {
        active.prize_pool = Set(prize_pool);
    }
    if let Some(difficulty) = payload.difficulty {
        active.difficulty = Set(difficulty);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url);
    }
    active.updated_at = Set(Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    let registered = is_participant(&state.db, id, principal.id).await?;
    Ok(ApiResponse::ok(ListingResponse::new(model, count, registered)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Listings",
    operation_id = "deleteListing",
    summary = "Delete a listing",
    description = "Owner host or admin only. Permanently deletes the listing together with its registrations, teams and team memberships.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Listing deleted", body = ApiResponse<NoData>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(kind = %kind, id))]
pub async fn delete_listing(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = find_listing_for_update(&txn, kind, id).await?;
    require_owner_or_admin(&principal, existing.host_id, &kind.label().to_lowercase())?;

    let team_ids: Vec<i32> = team::Entity::find()
        .filter(team::Column::ListingId.eq(id))
        .select_only()
        .column(team::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;
    if !team_ids.is_empty() {
        team_member::Entity::delete_many()
            .filter(team_member::Column::TeamId.is_in(team_ids))
            .exec(&txn)
            .await?;
    }
    team::Entity::delete_many()
        .filter(team::Column::ListingId.eq(id))
        .exec(&txn)
        .await?;
    let removed = listing_participant::Entity::delete_many()
        .filter(listing_participant::Column::ListingId.eq(id))
        .exec(&txn)
        .await?;
    listing::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        listing_id = id,
        registrations = removed.rows_affected,
        user_id = principal.id,
        "Listing deleted"
    );

    Ok(ApiResponse::message(format!("{} deleted", kind.label())))
}

#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "Listings",
    operation_id = "registerForListing",
    summary = "Register the caller as a participant",
    description = "Fails with 400 when registration is closed, when the caller is already registered (`Already registered`), or when the listing is at capacity. The listing row is locked while the checks run, so concurrent registrations cannot overshoot capacity.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 201, description = "Registered", body = ApiResponse<RegistrationResponse>),
        (status = 400, description = "Closed, duplicate or full (VALIDATION_ERROR, ALREADY_REGISTERED, CAPACITY_REACHED)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(kind = %kind, listing_id))]
pub async fn register_for_listing(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let now = Utc::now();

    let txn = state.db.begin().await?;
    let model = find_listing_for_update(&txn, kind, listing_id).await?;

    if !registration_open(&model, now) {
        return Err(AppError::Validation("Registration is closed".into()));
    }
    if is_participant(&txn, listing_id, principal.id).await? {
        return Err(AppError::AlreadyRegistered("Already registered".into()));
    }
    let count = participant_count(&txn, listing_id).await?;
    if !has_capacity(model.max_participants, count) {
        return Err(AppError::CapacityReached(format!("{} is full", kind.label())));
    }

    let row = listing_participant::ActiveModel {
        listing_id: Set(listing_id),
        user_id: Set(principal.id),
        registered_at: Set(now),
    };
    let row = match row.insert(&txn).await {
        Ok(row) => row,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::debug!("Registration race: unique constraint caught on insert");
            return Err(AppError::AlreadyRegistered("Already registered".into()));
        }
        Err(e) => return Err(e.into()),
    };

    points::award(&txn, principal.id, points::REGISTER_LISTING).await?;
    txn.commit().await?;

    tracing::info!(listing_id, user_id = principal.id, "Registered for listing");

    Ok(ApiResponse::created(RegistrationResponse {
        listing_id: row.listing_id,
        user_id: row.user_id,
        registered_at: row.registered_at,
    })
    .with_message("Registered successfully"))
}

#[utoipa::path(
    delete,
    path = "/{id}/register",
    tag = "Listings",
    operation_id = "unregisterFromListing",
    summary = "Withdraw the caller's registration",
    description = "Returns 404 when the caller is not registered, and 400 while the caller still belongs to a team of this listing.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Unregistered", body = ApiResponse<NoData>),
        (status = 400, description = "Still in a team (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not registered or not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(kind = %kind, listing_id))]
pub async fn unregister_from_listing(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
) -> Result<ApiResponse<NoData>, AppError> {
    let txn = state.db.begin().await?;
    find_listing_for_update(&txn, kind, listing_id).await?;

    let row = listing_participant::Entity::find_by_id((listing_id, auth_user.user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Not registered for this {}",
                kind.label().to_lowercase()
            ))
        })?;

    let in_team = team_member::Entity::find()
        .inner_join(team::Entity)
        .filter(team::Column::ListingId.eq(listing_id))
        .filter(team_member::Column::UserId.eq(auth_user.user_id))
        .one(&txn)
        .await?
        .is_some();
    if in_team {
        return Err(AppError::Validation(
            "Leave your team before unregistering".into(),
        ));
    }

    let active: listing_participant::ActiveModel = row.into();
    active.delete(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::message("Registration cancelled"))
}

#[utoipa::path(
    get,
    path = "/{id}/participants",
    tag = "Listings",
    operation_id = "listListingParticipants",
    summary = "List participants of a listing",
    description = "Owner host or admin only. Ordered by registration time.",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Participants", body = ApiResponse<Vec<ParticipantResponse>>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(kind = %kind, listing_id))]
pub async fn list_participants(
    Extension(kind): Extension<ListingKind>,
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(listing_id): Path<i32>,
) -> Result<ApiResponse<Vec<ParticipantResponse>>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let model = find_listing(&state.db, kind, listing_id).await?;
    require_owner_or_admin(&principal, model.host_id, &kind.label().to_lowercase())?;

    let rows = listing_participant::Entity::find()
        .filter(listing_participant::Column::ListingId.eq(listing_id))
        .order_by_asc(listing_participant::Column::RegisteredAt)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .filter_map(|(p, u)| {
            u.map(|u| ParticipantResponse {
                user_id: p.user_id,
                name: u.name,
                email: u.email,
                registered_at: p.registered_at,
            })
        })
        .collect();

    Ok(ApiResponse::ok(data))
}
