use common::ListingKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An event-like resource: hackathon, course, conference, and so on.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listing")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub kind: ListingKind,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown
    pub location: Option<String>,
    pub is_online: bool,

    #[sea_orm(indexed)]
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    /// Registration closes at this instant; defaults to `end_date` when absent.
    pub registration_deadline: Option<DateTimeUtc>,
    /// `None` means unlimited.
    pub max_participants: Option<i32>,

    /// JSON array of tag strings.
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: serde_json::Value,
    pub prize_pool: Option<String>,
    pub difficulty: Option<String>,
    pub image_url: Option<String>,

    #[sea_orm(indexed)]
    pub host_id: i32,
    #[sea_orm(belongs_to, from = "host_id", to = "id")]
    pub host: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub teams: HasMany<super::team::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
