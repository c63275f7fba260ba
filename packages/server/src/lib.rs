pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use common::ListingKind;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Community Hub API",
        version = "1.0.0",
        description = "Hackathons, events, courses and the community around them: teams, forums, mentorships, ideas and success stories."
    ),
    tags(
        (name = "Auth", description = "Registration, login and the session cookie"),
        (name = "Users", description = "Profiles, host applications and the caller's own activity"),
        (name = "Admin", description = "User moderation, host approval and site statistics"),
        (name = "Listings", description = "Hackathons, events, conferences, courses, tutorials and contests"),
        (name = "Teams", description = "Teams formed around a listing"),
        (name = "Forums", description = "Discussion threads and replies"),
        (name = "Mentorship", description = "Mentor requests and scheduled sessions"),
        (name = "Success Stories", description = "Stories shared by the community"),
        (name = "Ideas", description = "Project ideas and votes"),
        (name = "Leaderboard", description = "Users ranked by points"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Listing handlers are mounted once per kind, so their operation IDs repeat.
/// Prefix each with the kind's URL segment to keep them unique in the document.
fn qualify_listing_operations(api: &mut utoipa::openapi::OpenApi) {
    for (path, item) in api.paths.paths.iter_mut() {
        let Some(kind) = ListingKind::ALL.iter().find(|k| {
            let prefix = format!("/api/v1/{}", k.path_segment());
            path == &prefix || path.starts_with(&format!("{prefix}/"))
        }) else {
            continue;
        };

        let operations = [
            &mut item.get,
            &mut item.post,
            &mut item.patch,
            &mut item.put,
            &mut item.delete,
        ];
        for operation in operations.into_iter().flatten() {
            if let Some(id) = operation.operation_id.as_mut() {
                *id = format!("{}.{}", kind.path_segment(), id);
            }
        }
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    let (router, mut api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();
    qualify_listing_operations(&mut api);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}
