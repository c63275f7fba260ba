use chrono::{DateTime, Utc};
use common::UserRole;
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;

/// Request body for account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Email address, used to log in. Stored lowercase.
    #[schema(example = "ada@example.com")]
    pub email: String,
    /// Display name (1-64 characters).
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(AppError::Validation("Name must be 1-64 characters".into()));
    }
    Ok(())
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    validate_email(&payload.email)?;
    validate_name(&payload.name)?;
    let password_len = payload.password.chars().count();
    if !(8..=128).contains(&password_len) {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// The authenticated user's own account, as returned by register, login and `/me`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AccountResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_host_approved: bool,
    pub host_applied_at: Option<DateTime<Utc>>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub points: i32,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for AccountResponse {
    fn from(u: user::Model) -> Self {
        Self {
            skills: common::tags::from_json(&u.skills),
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            is_active: u.is_active,
            is_host_approved: u.is_host_approved,
            host_applied_at: u.host_applied_at,
            bio: u.bio,
            points: u.points,
            level: u.level,
            created_at: u.created_at,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// Signed session token; also set as the `session` cookie.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub user: AccountResponse,
}
