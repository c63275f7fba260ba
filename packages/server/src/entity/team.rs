use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "listing_team_name")]
    pub listing_id: i32,
    #[sea_orm(belongs_to, from = "listing_id", to = "id")]
    pub listing: HasOne<super::listing::Entity>,

    #[sea_orm(unique_key = "listing_team_name")]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub leader_id: i32,
    pub max_members: i32,
    /// JSON array of skills the team is looking for.
    #[sea_orm(column_type = "JsonBinary")]
    pub looking_for: serde_json::Value,

    #[sea_orm(has_many)]
    pub members: HasMany<super::team_member::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
