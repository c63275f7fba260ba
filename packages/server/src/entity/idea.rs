use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "idea")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// JSON array of technologies.
    #[sea_orm(column_type = "JsonBinary")]
    pub tech_stack: serde_json::Value,
    #[sea_orm(indexed)]
    pub category: Option<String>,
    /// Denormalised count of `idea_vote` rows.
    #[sea_orm(default_value = 0)]
    pub votes: i32,

    #[sea_orm(has_many)]
    pub vote_rows: HasMany<super::idea_vote::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
