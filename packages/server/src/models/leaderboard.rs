use common::UserRole;
use serde::{Deserialize, Serialize};

use crate::entity::user;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position across the whole board, not just this page.
    #[schema(example = 1)]
    pub rank: u64,
    pub user_id: i32,
    pub name: String,
    pub role: UserRole,
    pub points: i32,
    pub level: i32,
}

impl LeaderboardEntry {
    pub fn new(rank: u64, u: user::Model) -> Self {
        Self {
            rank,
            user_id: u.id,
            name: u.name,
            role: u.role,
            points: u.points,
            level: u.level,
        }
    }
}

/// Ranks for a page: the first row on page `page` sits at `(page - 1) * per_page + 1`.
pub fn first_rank(page: u64, per_page: u64) -> u64 {
    (page - 1) * per_page + 1
}
