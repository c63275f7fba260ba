use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use common::UserRole;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Name of the cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "session";

/// Authenticated principal resolved from the session token.
///
/// The token is read from `Authorization: Bearer <token>` first, then from the
/// `session` cookie. Add this as a handler parameter to require authentication;
/// role and flag checks happen in the handler body via `utils::access`, after
/// the current user row is loaded, since approval can change after a token is issued.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: UserRole,
}

fn token_from_parts(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(header) = parts.headers.get("Authorization") {
        let value = header.to_str().map_err(|_| AppError::TokenInvalid)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;
        return Ok(Some(token.trim().to_string()));
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty()))
}

fn decode(token: &str, state: &AppState) -> Result<AuthUser, AppError> {
    let claims =
        jwt::verify(token, &state.config.auth.jwt_secret).map_err(|_| AppError::TokenInvalid)?;
    Ok(AuthUser {
        user_id: claims.uid,
        email: claims.sub,
        role: claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)?.ok_or(AppError::TokenMissing)?;
        decode(&token, state)
    }
}

/// Public endpoints take `Option<AuthUser>`: no token means anonymous, a bad token is still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match token_from_parts(parts)? {
            Some(token) => decode(&token, state).map(Some),
            None => Ok(None),
        }
    }
}
