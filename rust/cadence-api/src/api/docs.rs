//! OpenAPI document.

use axum::{Json, Router, extract::State, middleware, routing::get};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{OpenApi as OpenApiDoc, Server};
use utoipa::{Modify, OpenApi};

use crate::AppState;
use crate::api::{health, response, scheduler};
use crate::codes::DisplayMessage;
use crate::config::{MetaConfig, RouteConfig};
use crate::gateway::basic_auth::basic_auth;

#[derive(OpenApi)]
#[openapi(
    paths(health::ping, scheduler::trigger_scheduler),
    components(schemas(
        response::Envelope,
        response::Meta,
        response::MetaError,
        response::Pagination,
        DisplayMessage,
        scheduler::TriggerSchedulerParams,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "scheduler", description = "Scheduled task administration")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut OpenApiDoc) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the document with the service metadata filled in.
#[must_use]
pub fn openapi(meta: &MetaConfig) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    doc.info.title.clone_from(&meta.title);
    doc.info.version.clone_from(&meta.version);
    doc.info.description = Some(meta.description.clone());

    let server_url = format!("{}{}", meta.host, meta.base_path);
    if !server_url.is_empty() {
        doc.servers = Some(vec![Server::new(server_url)]);
    }
    doc
}

/// Create the docs router: `GET {path}/openapi.json`, behind basic auth.
pub fn router(config: &RouteConfig) -> Router<AppState> {
    let path = format!("{}/openapi.json", config.path.trim_end_matches('/'));
    Router::new()
        .route(&path, get(openapi_json))
        .layer(middleware::from_fn_with_state(
            config.basic_auth.clone(),
            basic_auth,
        ))
}

async fn openapi_json(State(state): State<AppState>) -> Json<OpenApiDoc> {
    Json(openapi(&state.config.meta))
}
