use common::UserRole;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lowercase.
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    pub password: String,

    #[sea_orm(indexed)]
    pub role: UserRole,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    #[sea_orm(default_value = false)]
    pub is_host_approved: bool,
    /// Set when a USER applies to become a HOST; cleared on revoke.
    pub host_applied_at: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    /// JSON array of skill names.
    #[sea_orm(column_type = "JsonBinary")]
    pub skills: serde_json::Value,

    #[sea_orm(default_value = 0, indexed)]
    pub points: i32,
    #[sea_orm(default_value = 1)]
    pub level: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
