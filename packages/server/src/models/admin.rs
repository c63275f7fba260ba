use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminUserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// `USER`, `HOST` or `ADMIN`.
    pub role: Option<String>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetUserStatusRequest {
    pub is_active: bool,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AwardPointsRequest {
    /// May be negative. The total never drops below zero.
    #[schema(example = 50)]
    pub points: i32,
    #[schema(example = "Won the spring hackathon")]
    pub reason: String,
}

pub fn validate_award_points(req: &AwardPointsRequest) -> Result<(), AppError> {
    if req.points == 0 || req.points.abs() > 10_000 {
        return Err(AppError::Validation(
            "Points must be non-zero and within ±10000".into(),
        ));
    }
    if req.reason.trim().is_empty() || req.reason.chars().count() > 200 {
        return Err(AppError::Validation(
            "Reason must be 1-200 characters".into(),
        ));
    }
    Ok(())
}

/// Row counts shown on the admin dashboard.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub users: u64,
    pub hosts: u64,
    pub pending_host_applications: u64,
    pub listings: u64,
    pub registrations: u64,
    pub teams: u64,
    pub forums: u64,
    pub ideas: u64,
    pub success_stories: u64,
    pub mentorships: u64,
}
