use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A discussion thread.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "forum")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String, // in Markdown
    #[sea_orm(indexed)]
    pub category: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,

    #[sea_orm(indexed)]
    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    #[sea_orm(default_value = 0)]
    pub views: i32,
    #[sea_orm(default_value = false)]
    pub is_pinned: bool,

    #[sea_orm(has_many)]
    pub replies: HasMany<super::forum_reply::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
