use common::MentorshipStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "mentorship")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    // Both reference `user.id`.
    #[sea_orm(indexed)]
    pub mentor_id: i32,
    #[sea_orm(indexed)]
    pub mentee_id: i32,

    pub topic: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub message: Option<String>,
    pub status: MentorshipStatus,

    #[sea_orm(has_many)]
    pub sessions: HasMany<super::mentorship_session::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
