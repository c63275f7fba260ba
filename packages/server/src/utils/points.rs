use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};

use crate::entity::user;
use crate::error::AppError;

pub const REGISTER_LISTING: i32 = 10;
pub const CREATE_FORUM: i32 = 5;
pub const CREATE_REPLY: i32 = 2;
pub const SHARE_STORY: i32 = 20;
pub const POST_IDEA: i32 = 5;
pub const COMPLETE_SESSION: i32 = 15;

const POINTS_PER_LEVEL: i32 = 100;

/// Level derived from a point total: 0-99 is level 1, 100-199 level 2, and so on.
pub fn level_for(points: i32) -> i32 {
    points.max(0) / POINTS_PER_LEVEL + 1
}

/// Add `delta` points to a user (floored at zero) and recompute the level.
///
/// Call inside the transaction that performed the rewarded action; the user row is
/// locked so concurrent awards do not lose updates.
pub async fn award<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    delta: i32,
) -> Result<user::Model, AppError> {
    let existing = user::Entity::find_by_id(user_id)
        .lock(LockType::Update)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let points = existing.points.saturating_add(delta).max(0);
    let mut active: user::ActiveModel = existing.into();
    active.points = Set(points);
    active.level = Set(level_for(points));
    let updated = active.update(db).await?;

    tracing::debug!(user_id, delta, points, level = updated.level, "Awarded points");
    Ok(updated)
}
