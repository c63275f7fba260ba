use axum::extract::State;
use sea_orm::*;
use tracing::instrument;

use crate::entity::user;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppQuery;
use crate::models::leaderboard::*;
use crate::models::shared::{ApiResponse, Paginated, Pagination, page_params};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Leaderboard",
    operation_id = "getLeaderboard",
    summary = "Points leaderboard",
    description = "Public. Active users ordered by points (highest first), ties broken by user ID.",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Page of ranked users", body = ApiResponse<Paginated<LeaderboardEntry>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn leaderboard(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LeaderboardQuery>,
) -> Result<ApiResponse<Paginated<LeaderboardEntry>>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);
    let select = user::Entity::find().filter(user::Column::IsActive.eq(true));

    let total = select.clone().count(&state.db).await?;
    let users = select
        .order_by_desc(user::Column::Points)
        .order_by_asc(user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let start = first_rank(page, per_page);
    let items = users
        .into_iter()
        .zip(start..)
        .map(|(u, rank)| LeaderboardEntry::new(rank, u))
        .collect();

    Ok(ApiResponse::ok(Paginated {
        items,
        pagination: Pagination::new(page, per_page, total),
    }))
}
