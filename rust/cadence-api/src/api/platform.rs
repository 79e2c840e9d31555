//! Effective configuration endpoint for operators.

use axum::{
    Router,
    extract::{Query, State},
    middleware,
    response::Response,
    routing::get,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::response;
use crate::codes::Code;
use crate::config::RouteConfig;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::gateway::basic_auth::basic_auth;

/// Create the platform router: `GET {path}`, behind basic auth.
pub fn router(config: &RouteConfig) -> Router<AppState> {
    Router::new()
        .route(&config.path, get(platform_info))
        .layer(middleware::from_fn_with_state(
            config.basic_auth.clone(),
            basic_auth,
        ))
}

#[derive(Debug, Default, Deserialize)]
struct PlatformParams {
    #[serde(default)]
    output: Option<String>,
}

/// The loaded configuration. Secrets are never serialized.
///
/// `?output=yaml` returns the bare document as YAML instead of the envelope.
async fn platform_info(
    ctx: RequestContext,
    State(state): State<AppState>,
    Query(params): Query<PlatformParams>,
) -> Response {
    match params.output.as_deref() {
        Some("yaml") => match serde_yaml::to_string(state.config.as_ref()) {
            Ok(yaml) => response::raw(&ctx, "application/yaml", yaml),
            Err(e) => response::error(&ctx, AppError::internal(format!("yaml encoding failed: {e}"))),
        },
        _ => response::success(&ctx, Code::Success, state.config.as_ref(), None),
    }
}
