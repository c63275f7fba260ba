use anyhow::Context;
use chrono::Utc;
use common::UserRole;
use rand::distr::{Alphanumeric, SampleString};
use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::BootstrapConfig;
use crate::entity::{forum, listing, mentorship, team_member, user};
use crate::utils::hash;

const DEFAULT_ADMIN_EMAIL: &str = "admin@hub.local";
const GENERATED_PASSWORD_LEN: usize = 20;

async fn create_index(db: &DatabaseConnection, name: &str, mut stmt: IndexCreateStatement) {
    let sql = stmt.if_not_exists().name(name).to_string(PostgresQueryBuilder);
    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Listing pages: WHERE kind = ? ORDER BY start_date
    create_index(
        db,
        "idx_listing_kind_start",
        Index::create()
            .table(listing::Entity)
            .col(listing::Column::Kind)
            .col(listing::Column::StartDate)
            .to_owned(),
    )
    .await;

    // Open-mentorship check per mentor/mentee pair
    create_index(
        db,
        "idx_mentorship_pair_status",
        Index::create()
            .table(mentorship::Entity)
            .col(mentorship::Column::MentorId)
            .col(mentorship::Column::MenteeId)
            .col(mentorship::Column::Status)
            .to_owned(),
    )
    .await;

    // Forum front page: pinned first, newest first
    create_index(
        db,
        "idx_forum_pinned_created",
        Index::create()
            .table(forum::Entity)
            .col(forum::Column::IsPinned)
            .col(forum::Column::CreatedAt)
            .to_owned(),
    )
    .await;

    // "My teams" and one-team-per-listing lookups
    create_index(
        db,
        "idx_team_member_user",
        Index::create()
            .table(team_member::Entity)
            .col(team_member::Column::UserId)
            .to_owned(),
    )
    .await;

    Ok(())
}

/// Make sure at least one admin exists.
///
/// Does nothing when an admin is already present. Otherwise creates the configured
/// account, or promotes it if a user with that email registered first. When no
/// password is configured a random one is generated and logged once.
pub async fn bootstrap_admin(db: &DatabaseConnection, config: &BootstrapConfig) -> anyhow::Result<()> {
    let admins = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Admin))
        .count(db)
        .await?;
    if admins > 0 {
        return Ok(());
    }

    let email = config
        .admin_email
        .as_deref()
        .unwrap_or(DEFAULT_ADMIN_EMAIL)
        .trim()
        .to_lowercase();

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if let Some(existing) = existing {
        let mut active: user::ActiveModel = existing.into();
        active.role = Set(UserRole::Admin);
        active.is_active = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        tracing::warn!(email = %email, "Promoted existing user to bootstrap admin");
        return Ok(());
    }

    let (password, generated) = match config.admin_password {
        Some(ref password) => (password.clone(), false),
        None => (
            Alphanumeric.sample_string(&mut rand::rng(), GENERATED_PASSWORD_LEN),
            true,
        ),
    };
    let password_hash = hash::hash_password(&password).context("hashing bootstrap password")?;

    let now = Utc::now();
    let admin = user::ActiveModel {
        email: Set(email.clone()),
        name: Set("Administrator".to_string()),
        password: Set(password_hash),
        role: Set(UserRole::Admin),
        is_active: Set(true),
        is_host_approved: Set(true),
        host_applied_at: Set(None),
        bio: Set(None),
        skills: Set(serde_json::json!([])),
        points: Set(0),
        level: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    if generated {
        tracing::warn!(
            user_id = admin.id,
            email = %email,
            password = %password,
            "Created bootstrap admin with a generated password; change it after first login"
        );
    } else {
        info!(user_id = admin.id, email = %email, "Created bootstrap admin");
    }

    Ok(())
}
