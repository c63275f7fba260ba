use axum::Extension;
use common::ListingKind;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    let router = OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/admin", admin_routes())
        .nest("/teams", team_routes())
        .nest("/forums", forum_routes())
        .nest("/mentorships", mentorship_routes())
        .nest("/success-stories", story_routes())
        .nest("/ideas", idea_routes())
        .nest("/leaderboard", leaderboard_routes());

    ListingKind::ALL.iter().fold(router, |router, &kind| {
        router.nest(&format!("/{}", kind.path_segment()), listing_routes(kind))
    })
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::update_me))
        .routes(routes!(handlers::user::apply_for_host))
        .routes(routes!(handlers::user::my_registrations))
        .routes(routes!(handlers::user::my_teams))
        .routes(routes!(handlers::user::get_profile))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::list_users))
        .routes(routes!(handlers::admin::list_host_applications))
        .routes(routes!(handlers::admin::approve_host))
        .routes(routes!(handlers::admin::revoke_host))
        .routes(routes!(handlers::admin::set_user_status))
        .routes(routes!(handlers::admin::award_points))
        .routes(routes!(handlers::admin::stats))
}

/// The same handlers serve every listing kind; the kind rides along as an extension.
fn listing_routes(kind: ListingKind) -> OpenApiRouter<AppState> {
    let router = OpenApiRouter::new()
        .routes(routes!(
            handlers::listing::list_listings,
            handlers::listing::create_listing
        ))
        .routes(routes!(
            handlers::listing::get_listing,
            handlers::listing::update_listing,
            handlers::listing::delete_listing
        ))
        .routes(routes!(
            handlers::listing::register_for_listing,
            handlers::listing::unregister_from_listing
        ))
        .routes(routes!(handlers::listing::list_participants));

    let router = if kind.supports_teams() {
        router.routes(routes!(
            handlers::team::list_teams,
            handlers::team::create_team
        ))
    } else {
        router
    };

    router.layer(Extension(kind))
}

fn team_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::team::get_team,
            handlers::team::update_team,
            handlers::team::delete_team
        ))
        .routes(routes!(handlers::team::join_team))
        .routes(routes!(handlers::team::leave_team))
        .routes(routes!(handlers::team::remove_member))
}

fn forum_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::forum::list_forums,
            handlers::forum::create_forum
        ))
        .routes(routes!(
            handlers::forum::get_forum,
            handlers::forum::update_forum,
            handlers::forum::delete_forum
        ))
        .routes(routes!(handlers::forum::create_reply))
        .routes(routes!(handlers::forum::delete_reply))
}

fn mentorship_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::mentorship::request_mentorship,
            handlers::mentorship::list_mentorships
        ))
        .routes(routes!(handlers::mentorship::get_mentorship))
        .routes(routes!(handlers::mentorship::respond_mentorship))
        .routes(routes!(handlers::mentorship::complete_mentorship))
        .routes(routes!(
            handlers::mentorship::create_session,
            handlers::mentorship::list_sessions
        ))
        .routes(routes!(handlers::mentorship::update_session))
}

fn story_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::story::list_stories,
            handlers::story::create_story
        ))
        .routes(routes!(
            handlers::story::get_story,
            handlers::story::update_story,
            handlers::story::delete_story
        ))
        .routes(routes!(handlers::story::feature_story))
}

fn idea_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::idea::list_ideas, handlers::idea::create_idea))
        .routes(routes!(
            handlers::idea::get_idea,
            handlers::idea::update_idea,
            handlers::idea::delete_idea
        ))
        .routes(routes!(
            handlers::idea::vote_idea,
            handlers::idea::unvote_idea
        ))
}

fn leaderboard_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::leaderboard::leaderboard))
}
