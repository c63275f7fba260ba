use axum::extract::State;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use common::UserRole;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, SESSION_COOKIE};
use crate::extractors::json::AppJson;
use crate::models::auth::{
    AccountResponse, LoginRequest, LoginResponse, RegisterRequest, normalize_email,
    validate_login_request, validate_register_request,
};
use crate::models::shared::{ApiResponse, NoData};
use crate::state::AppState;
use crate::utils::access::{load_principal, require_active};
use crate::utils::{hash, jwt};

#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Create an account",
    description = "Creates a USER account. The email is stored lowercase.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    let email = normalize_email(&payload.email);

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let now = chrono::Utc::now();
    let new_user = user::ActiveModel {
        email: Set(email),
        name: Set(payload.name.trim().to_string()),
        password: Set(hash),
        role: Set(UserRole::User),
        is_active: Set(true),
        is_host_approved: Set(false),
        host_applied_at: Set(None),
        bio: Set(None),
        skills: Set(serde_json::json!([])),
        points: Set(0),
        level: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = user.id, "Account registered");

    Ok(ApiResponse::created(AccountResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Verifies credentials and returns a signed session token. The token is also set as an HttpOnly `session` cookie.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Account deactivated (FORBIDDEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_login_request(&payload)?;

    let email = normalize_email(&payload.email);

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }
    require_active(&user)?;

    let auth = &state.config.auth;
    let token = jwt::sign(user.id, &user.email, user.role, &auth.jwt_secret, auth.token_ttl_hours)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(auth.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(auth.token_ttl_hours));

    Ok((
        jar.add(cookie),
        ApiResponse::ok(LoginResponse {
            token,
            user: AccountResponse::from(user),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    operation_id = "logout",
    summary = "Log out",
    description = "Clears the session cookie. Bearer tokens stay valid until they expire.",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<NoData>),
    ),
)]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        ApiResponse::message("Logged out"),
    )
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the current user",
    description = "Returns the caller's account as currently stored, so role and approval changes show up without logging in again.",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<AccountResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account deactivated (FORBIDDEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let principal = load_principal(&state.db, &auth_user).await?;
    Ok(ApiResponse::ok(AccountResponse::from(principal)))
}
