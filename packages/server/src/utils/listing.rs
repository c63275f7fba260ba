use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::ListingKind;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::entity::{listing, listing_participant};
use crate::error::AppError;

/// Where a listing sits on its timeline relative to now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Upcoming,
    Ongoing,
    Past,
}

impl ListingStatus {
    pub fn at(listing: &listing::Model, now: DateTime<Utc>) -> Self {
        if now < listing.start_date {
            Self::Upcoming
        } else if now < listing.end_date {
            Self::Ongoing
        } else {
            Self::Past
        }
    }
}

/// Registration is open until the deadline, or until the end date when no deadline is set.
pub fn registration_open(listing: &listing::Model, now: DateTime<Utc>) -> bool {
    now < listing.registration_deadline.unwrap_or(listing.end_date)
}

/// Whether one more participant fits. `None` capacity is unlimited.
pub fn has_capacity(max_participants: Option<i32>, current: u64) -> bool {
    match max_participants {
        Some(max) => current < std::cmp::Ord::max(max, 0) as u64,
        None => true,
    }
}

fn not_found(kind: ListingKind) -> AppError {
    AppError::NotFound(format!("{} not found", kind.label()))
}

/// Look up a listing of the given kind; a listing of another kind is reported as missing.
pub async fn find_listing<C: ConnectionTrait>(
    db: &C,
    kind: ListingKind,
    id: i32,
) -> Result<listing::Model, AppError> {
    listing::Entity::find_by_id(id)
        .filter(listing::Column::Kind.eq(kind))
        .one(db)
        .await?
        .ok_or_else(|| not_found(kind))
}

/// Same as [`find_listing`], holding a row lock until the transaction ends.
///
/// Registration paths take this lock before counting participants, so two
/// requests racing for the last seat are serialised.
pub async fn find_listing_for_update(
    txn: &DatabaseTransaction,
    kind: ListingKind,
    id: i32,
) -> Result<listing::Model, AppError> {
    listing::Entity::find_by_id(id)
        .filter(listing::Column::Kind.eq(kind))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| not_found(kind))
}

pub async fn participant_count<C: ConnectionTrait>(db: &C, listing_id: i32) -> Result<u64, AppError> {
    Ok(listing_participant::Entity::find()
        .filter(listing_participant::Column::ListingId.eq(listing_id))
        .count(db)
        .await?)
}

/// Participant counts for a page of listings, keyed by listing id. Missing ids have zero.
pub async fn participant_counts<C: ConnectionTrait>(
    db: &C,
    listing_ids: Vec<i32>,
) -> Result<HashMap<i32, u64>, AppError> {
    if listing_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i64)> = listing_participant::Entity::find()
        .filter(listing_participant::Column::ListingId.is_in(listing_ids))
        .select_only()
        .column(listing_participant::Column::ListingId)
        .column_as(listing_participant::Column::UserId.count(), "count")
        .group_by(listing_participant::Column::ListingId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, std::cmp::Ord::max(count, 0) as u64))
        .collect())
}

pub async fn is_participant<C: ConnectionTrait>(
    db: &C,
    listing_id: i32,
    user_id: i32,
) -> Result<bool, AppError> {
    Ok(listing_participant::Entity::find_by_id((listing_id, user_id))
        .one(db)
        .await?
        .is_some())
}
