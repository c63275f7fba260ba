use chrono::{DateTime, Utc};
use common::{MentorshipStatus, SessionStatus};
use serde::{Deserialize, Serialize};

use super::shared::double_option;
use crate::entity::{mentorship, mentorship_session};
use crate::error::AppError;

pub const MIN_SESSION_MINUTES: i32 = 15;
pub const MAX_SESSION_MINUTES: i32 = 480;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateMentorshipRequest {
    /// An approved host or an admin.
    pub mentor_id: i32,
    #[schema(example = "Getting started with embedded Rust")]
    pub topic: String,
    pub message: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MentorshipListQuery {
    /// `mentor` or `mentee`; both sides when absent.
    #[serde(rename = "as")]
    pub role: Option<String>,
    /// `PENDING`, `ACTIVE`, `DECLINED` or `COMPLETED`.
    pub status: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RespondMentorshipRequest {
    pub accept: bool,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSessionRequest {
    pub scheduled_at: DateTime<Utc>,
    #[schema(example = 60)]
    pub duration_minutes: i32,
    pub agenda: String,
}

/// Only `SCHEDULED` sessions may change status. `notes: null` clears the notes.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateSessionRequest {
    pub status: Option<SessionStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MentorshipResponse {
    pub id: i32,
    pub mentor_id: i32,
    pub mentor_name: Option<String>,
    pub mentee_id: i32,
    pub mentee_name: Option<String>,
    pub topic: String,
    pub message: Option<String>,
    pub status: MentorshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MentorshipResponse {
    pub fn new(
        m: mentorship::Model,
        mentor_name: Option<String>,
        mentee_name: Option<String>,
    ) -> Self {
        Self {
            id: m.id,
            mentor_id: m.mentor_id,
            mentor_name,
            mentee_id: m.mentee_id,
            mentee_name,
            topic: m.topic,
            message: m.message,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub id: i32,
    pub mentorship_id: i32,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub agenda: String,
    pub notes: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<mentorship_session::Model> for SessionResponse {
    fn from(s: mentorship_session::Model) -> Self {
        Self {
            id: s.id,
            mentorship_id: s.mentorship_id,
            scheduled_at: s.scheduled_at,
            duration_minutes: s.duration_minutes,
            agenda: s.agenda,
            notes: s.notes,
            status: s.status,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

pub fn validate_create_mentorship(req: &CreateMentorshipRequest) -> Result<(), AppError> {
    let topic = req.topic.trim();
    if topic.is_empty() || topic.chars().count() > 200 {
        return Err(AppError::Validation(
            "Topic must be 1-200 characters".into(),
        ));
    }
    if let Some(ref message) = req.message
        && message.chars().count() > 2000
    {
        return Err(AppError::Validation(
            "Message must be at most 2000 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_session(
    req: &CreateSessionRequest,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if req.scheduled_at <= now {
        return Err(AppError::Validation(
            "scheduled_at must be in the future".into(),
        ));
    }
    if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&req.duration_minutes) {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between {MIN_SESSION_MINUTES} and {MAX_SESSION_MINUTES}"
        )));
    }
    let agenda = req.agenda.trim();
    if agenda.is_empty() || agenda.chars().count() > 2000 {
        return Err(AppError::Validation(
            "Agenda must be 1-2000 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_update_session(req: &UpdateSessionRequest) -> Result<(), AppError> {
    if req.status.is_none() && req.notes.is_none() {
        return Err(AppError::Validation(
            "Provide status or notes to update".into(),
        ));
    }
    if req.status == Some(SessionStatus::Scheduled) {
        return Err(AppError::Validation(
            "A session can only move to COMPLETED or CANCELLED".into(),
        ));
    }
    if let Some(Some(ref notes)) = req.notes
        && notes.len() > 20_000
    {
        return Err(AppError::Validation("Notes must be at most 20KB".into()));
    }
    Ok(())
}
