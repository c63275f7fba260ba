use std::collections::HashMap;

use sea_orm::sea_query::LockType;
use sea_orm::*;

use crate::entity::{listing, team, team_member, user};
use crate::error::AppError;

pub async fn find_team<C: ConnectionTrait>(db: &C, id: i32) -> Result<team::Model, AppError> {
    team::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Team not found"))
}

async fn find_team_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<team::Model, AppError> {
    team::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Team not found"))
}

/// Locks the parent listing of a team, whatever its kind.
async fn lock_listing(
    txn: &DatabaseTransaction,
    listing_id: i32,
) -> Result<listing::Model, AppError> {
    listing::Entity::find_by_id(listing_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::not_found("Listing not found"))
}

/// Lock a team for a membership or ownership change, holding both locks until
/// the transaction ends.
///
/// The parent listing is locked before the team, the order listing deletion and
/// registration use. This also keeps the one-team-per-listing rule race free.
pub async fn lock_team(txn: &DatabaseTransaction, team_id: i32) -> Result<team::Model, AppError> {
    let listing_id = find_team(txn, team_id).await?.listing_id;
    lock_listing(txn, listing_id).await?;
    find_team_for_update(txn, team_id).await
}

pub async fn member_count<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<u64, AppError> {
    Ok(team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .count(db)
        .await?)
}

pub async fn member_counts<C: ConnectionTrait>(
    db: &C,
    team_ids: Vec<i32>,
) -> Result<HashMap<i32, u64>, AppError> {
    if team_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = team_member::Entity::find()
        .filter(team_member::Column::TeamId.is_in(team_ids))
        .select_only()
        .column(team_member::Column::TeamId)
        .column_as(team_member::Column::UserId.count(), "count")
        .group_by(team_member::Column::TeamId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, std::cmp::Ord::max(count, 0) as u64))
        .collect())
}

/// The caller's membership in any team of the listing, if there is one.
pub async fn membership_in_listing<C: ConnectionTrait>(
    db: &C,
    listing_id: i32,
    user_id: i32,
) -> Result<Option<team_member::Model>, AppError> {
    Ok(team_member::Entity::find()
        .inner_join(team::Entity)
        .filter(team::Column::ListingId.eq(listing_id))
        .filter(team_member::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

pub fn has_room(max_members: i32, current: u64) -> bool {
    current < std::cmp::Ord::max(max_members, 0) as u64
}

pub fn require_leader_or_admin(user: &user::Model, team: &team::Model) -> Result<(), AppError> {
    if team.leader_id == user.id || user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the team leader or an admin can manage this team",
        ))
    }
}
