use common::UserRole;
use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entity::user;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// Load the current user row for an authenticated request.
///
/// Tokens outlive role changes, so every gated handler reads the row instead of
/// trusting the role claim. A token for a deleted user is treated as invalid.
pub async fn load_principal<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
) -> Result<user::Model, AppError> {
    let principal = user::Entity::find_by_id(auth_user.user_id)
        .one(db)
        .await?
        .ok_or(AppError::TokenInvalid)?;
    require_active(&principal)?;
    Ok(principal)
}

pub fn require_active(user: &user::Model) -> Result<(), AppError> {
    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }
    Ok(())
}

/// Admins, and hosts whose application was approved.
pub fn is_approved_host(user: &user::Model) -> bool {
    match user.role {
        UserRole::Admin => true,
        UserRole::Host => user.is_host_approved,
        UserRole::User => false,
    }
}

/// Gate for creating hosted resources. `noun` is the plural shown to the caller.
pub fn require_host(user: &user::Model, noun: &str) -> Result<(), AppError> {
    if is_approved_host(user) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("Only hosts can create {noun}")))
    }
}

pub fn require_admin(user: &user::Model) -> Result<(), AppError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("Admin access required"))
    }
}

/// Owner-scoped mutation gate. `what` names the resource in the error message.
pub fn require_owner_or_admin(
    user: &user::Model,
    owner_id: i32,
    what: &str,
) -> Result<(), AppError> {
    if user.id == owner_id || user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Only the owner or an admin can modify this {what}"
        )))
    }
}
