use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use common::{MentorshipStatus, SessionStatus};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{mentorship, mentorship_session, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::mentorship::*;
use crate::models::shared::ApiResponse;
use crate::state::AppState;
use crate::utils::access::{is_approved_host, load_principal};
use crate::utils::points;

fn require_participant(user: &user::Model, m: &mentorship::Model) -> Result<(), AppError> {
    if user.id == m.mentor_id || user.id == m.mentee_id || user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the mentor or mentee can access this mentorship",
        ))
    }
}

fn require_party(user: &user::Model, m: &mentorship::Model) -> Result<(), AppError> {
    if user.id == m.mentor_id || user.id == m.mentee_id {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the mentor or mentee can change this mentorship",
        ))
    }
}

async fn find_mentorship_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<mentorship::Model, AppError> {
    mentorship::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Mentorship not found"))
}

async fn user_names<C: ConnectionTrait>(
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

async fn respond_with_names<C: ConnectionTrait>(
    db: &C,
    m: mentorship::Model,
) -> Result<MentorshipResponse, AppError> {
    let names = user_names(db, vec![m.mentor_id, m.mentee_id]).await?;
    let mentor = names.get(&m.mentor_id).cloned();
    let mentee = names.get(&m.mentee_id).cloned();
    Ok(MentorshipResponse::new(m, mentor, mentee))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Mentorship",
    operation_id = "requestMentorship",
    summary = "Request a mentor",
    description = "The mentor must be an active approved host or an admin. You cannot mentor yourself, and only one pending or active mentorship may exist per mentor and mentee.",
    request_body = CreateMentorshipRequest,
    responses(
        (status = 201, description = "Request sent", body = ApiResponse<MentorshipResponse>),
        (status = 400, description = "Invalid mentor or duplicate request (VALIDATION_ERROR, ALREADY_REGISTERED)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Mentor not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(mentor_id = payload.mentor_id))]
pub async fn request_mentorship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateMentorshipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    validate_create_mentorship(&payload)?;

    if payload.mentor_id == principal.id {
        return Err(AppError::validation("You cannot mentor yourself"));
    }

    let txn = state.db.begin().await?;
    // Locking the mentor serialises concurrent requests for the same pair.
    let mentor = user::Entity::find_by_id(payload.mentor_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Mentor not found"))?;
    if !mentor.is_active || !is_approved_host(&mentor) {
        return Err(AppError::validation(
            "Mentors must be approved hosts or admins",
        ));
    }

    let open = mentorship::Entity::find()
        .filter(mentorship::Column::MentorId.eq(mentor.id))
        .filter(mentorship::Column::MenteeId.eq(principal.id))
        .filter(
            mentorship::Column::Status
                .is_in([MentorshipStatus::Pending, MentorshipStatus::Active]),
        )
        .one(&txn)
        .await?;
    if open.is_some() {
        return Err(AppError::AlreadyRegistered(
            "You already have an open mentorship with this mentor".into(),
        ));
    }

    let now = Utc::now();
    let created = mentorship::ActiveModel {
        mentor_id: Set(mentor.id),
        mentee_id: Set(principal.id),
        topic: Set(payload.topic.trim().to_string()),
        message: Set(payload
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())),
        status: Set(MentorshipStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(
        mentorship_id = created.id,
        mentor_id = mentor.id,
        mentee_id = principal.id,
        "Mentorship requested"
    );

    Ok(ApiResponse::created(MentorshipResponse::new(
        created,
        Some(mentor.name),
        Some(principal.name),
    )))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Mentorship",
    operation_id = "listMyMentorships",
    summary = "List the caller's mentorships",
    description = "Newest first. `as=mentor` or `as=mentee` restricts to one side.",
    params(MentorshipListQuery),
    responses(
        (status = 200, description = "Mentorships", body = ApiResponse<Vec<MentorshipResponse>>),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_mentorships(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MentorshipListQuery>,
) -> Result<ApiResponse<Vec<MentorshipResponse>>, AppError> {
    let me = auth_user.user_id;
    let side = match query.role.as_deref() {
        None => Condition::any()
            .add(mentorship::Column::MentorId.eq(me))
            .add(mentorship::Column::MenteeId.eq(me)),
        Some("mentor") => Condition::all().add(mentorship::Column::MentorId.eq(me)),
        Some("mentee") => Condition::all().add(mentorship::Column::MenteeId.eq(me)),
        Some(_) => {
            return Err(AppError::validation("as must be one of: mentor, mentee"));
        }
    };

    let mut select = mentorship::Entity::find().filter(side);
    if let Some(ref status) = query.status {
        let status: MentorshipStatus = status
            .parse()
            .map_err(|e: common::ParseEnumError| AppError::Validation(e.to_string()))?;
        select = select.filter(mentorship::Column::Status.eq(status));
    }

    let rows = select
        .order_by_desc(mentorship::Column::CreatedAt)
        .order_by_desc(mentorship::Column::Id)
        .all(&state.db)
        .await?;

    let mut ids: Vec<i32> = rows
        .iter()
        .flat_map(|m| [m.mentor_id, m.mentee_id])
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let names = user_names(&state.db, ids).await?;

    let data = rows
        .into_iter()
        .map(|m| {
            let mentor = names.get(&m.mentor_id).cloned();
            let mentee = names.get(&m.mentee_id).cloned();
            MentorshipResponse::new(m, mentor, mentee)
        })
        .collect();

    Ok(ApiResponse::ok(data))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Mentorship",
    operation_id = "getMentorship",
    summary = "Get a mentorship",
    description = "Visible to the mentor, the mentee and admins.",
    params(("id" = i32, Path, description = "Mentorship ID")),
    responses(
        (status = 200, description = "Mentorship", body = ApiResponse<MentorshipResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_mentorship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<MentorshipResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let found = mentorship::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Mentorship not found"))?;
    require_participant(&principal, &found)?;

    Ok(ApiResponse::ok(respond_with_names(&state.db, found).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/respond",
    tag = "Mentorship",
    operation_id = "respondToMentorship",
    summary = "Accept or decline a request",
    description = "Mentor only, and only while the request is PENDING.",
    params(("id" = i32, Path, description = "Mentorship ID")),
    request_body = RespondMentorshipRequest,
    responses(
        (status = 200, description = "Responded", body = ApiResponse<MentorshipResponse>),
        (status = 400, description = "Not pending (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the mentor (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, accept = payload.accept))]
pub async fn respond_mentorship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RespondMentorshipRequest>,
) -> Result<ApiResponse<MentorshipResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = find_mentorship_for_update(&txn, id).await?;
    if existing.mentor_id != principal.id {
        return Err(AppError::forbidden("Only the mentor can respond to this request"));
    }
    if existing.status != MentorshipStatus::Pending {
        tracing::debug!(status = %existing.status, "Respond rejected");
        return Err(AppError::validation("Mentorship is not pending"));
    }

    let status = if payload.accept {
        MentorshipStatus::Active
    } else {
        MentorshipStatus::Declined
    };
    let mut active: mentorship::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(mentorship_id = id, status = %status, "Mentorship answered");

    Ok(ApiResponse::ok(respond_with_names(&state.db, updated).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/complete",
    tag = "Mentorship",
    operation_id = "completeMentorship",
    summary = "Mark a mentorship completed",
    description = "Mentor or mentee, only while ACTIVE.",
    params(("id" = i32, Path, description = "Mentorship ID")),
    responses(
        (status = 200, description = "Completed", body = ApiResponse<MentorshipResponse>),
        (status = 400, description = "Not active (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn complete_mentorship(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<MentorshipResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let existing = find_mentorship_for_update(&txn, id).await?;
    require_party(&principal, &existing)?;
    if existing.status != MentorshipStatus::Active {
        return Err(AppError::validation("Only active mentorships can be completed"));
    }

    let mut active: mentorship::ActiveModel = existing.into();
    active.status = Set(MentorshipStatus::Completed);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(mentorship_id = id, by = principal.id, "Mentorship completed");

    Ok(ApiResponse::ok(respond_with_names(&state.db, updated).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/sessions",
    tag = "Mentorship",
    operation_id = "scheduleSession",
    summary = "Schedule a session",
    description = "Mentor or mentee of an ACTIVE mentorship. The session must be in the future and last 15-480 minutes.",
    params(("id" = i32, Path, description = "Mentorship ID")),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session scheduled", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Validation error or not active (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(mentorship_id))]
pub async fn create_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(mentorship_id): Path<i32>,
    AppJson(payload): AppJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let parent = find_mentorship_for_update(&txn, mentorship_id).await?;
    require_party(&principal, &parent)?;
    if parent.status != MentorshipStatus::Active {
        return Err(AppError::validation(
            "Sessions can only be scheduled for active mentorships",
        ));
    }
    let now = Utc::now();
    validate_create_session(&payload, now)?;

    let session = mentorship_session::ActiveModel {
        mentorship_id: Set(mentorship_id),
        scheduled_at: Set(payload.scheduled_at),
        duration_minutes: Set(payload.duration_minutes),
        agenda: Set(payload.agenda.trim().to_string()),
        notes: Set(None),
        status: Set(SessionStatus::Scheduled),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok(ApiResponse::created(SessionResponse::from(session)))
}

#[utoipa::path(
    get,
    path = "/{id}/sessions",
    tag = "Mentorship",
    operation_id = "listSessions",
    summary = "List the sessions of a mentorship",
    description = "Ordered by scheduled time. Visible to the mentor, the mentee and admins.",
    params(("id" = i32, Path, description = "Mentorship ID")),
    responses(
        (status = 200, description = "Sessions", body = ApiResponse<Vec<SessionResponse>>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(mentorship_id))]
pub async fn list_sessions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(mentorship_id): Path<i32>,
) -> Result<ApiResponse<Vec<SessionResponse>>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    let parent = mentorship::Entity::find_by_id(mentorship_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::not_found("Mentorship not found"))?;
    require_participant(&principal, &parent)?;

    let sessions = mentorship_session::Entity::find()
        .filter(mentorship_session::Column::MentorshipId.eq(mentorship_id))
        .order_by_asc(mentorship_session::Column::ScheduledAt)
        .order_by_asc(mentorship_session::Column::Id)
        .all(&state.db)
        .await?;

    Ok(ApiResponse::ok(
        sessions.into_iter().map(SessionResponse::from).collect(),
    ))
}

#[utoipa::path(
    patch,
    path = "/{id}/sessions/{session_id}",
    tag = "Mentorship",
    operation_id = "updateSession",
    summary = "Update a session",
    description = "Mentor or mentee. Only SCHEDULED sessions change status; notes can be edited at any time. Completing a session awards the mentor 15 points.",
    params(
        ("id" = i32, Path, description = "Mentorship ID"),
        ("session_id" = i32, Path, description = "Session ID"),
    ),
    request_body = UpdateSessionRequest,
    responses(
        (status = 200, description = "Session updated", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Invalid transition (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a participant (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(mentorship_id, session_id))]
pub async fn update_session(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((mentorship_id, session_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateSessionRequest>,
) -> Result<ApiResponse<SessionResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let parent = find_mentorship_for_update(&txn, mentorship_id).await?;
    require_party(&principal, &parent)?;
    validate_update_session(&payload)?;

    let session = mentorship_session::Entity::find_by_id(session_id)
        .filter(mentorship_session::Column::MentorshipId.eq(mentorship_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;

    if payload.status.is_some() && session.status.is_final() {
        return Err(AppError::validation(format!(
            "Session is already {}",
            session.status
        )));
    }

    let mut active: mentorship_session::ActiveModel = session.into();
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    if payload.status == Some(SessionStatus::Completed) {
        points::award(&txn, parent.mentor_id, points::COMPLETE_SESSION).await?;
    }
    txn.commit().await?;

    if let Some(status) = payload.status {
        tracing::info!(session_id, mentorship_id, status = %status, "Session status changed");
    }

    Ok(ApiResponse::ok(SessionResponse::from(updated)))
}
