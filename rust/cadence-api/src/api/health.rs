//! Health check and ping endpoints.

use axum::{Json, Router, response::Response, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::api::response;
use crate::codes::Code;
use crate::context::RequestContext;

/// Create the health router. Mounted outside the application group.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Create the ping router. Mounted outside the application group.
pub fn ping_router() -> Router<AppState> {
    Router::new().route("/ping", get(ping))
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness ping.
#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses(
        (status = 200, description = "Service is up; data is \"PONG!\"", body = crate::api::response::Envelope)
    )
)]
pub async fn ping(ctx: RequestContext) -> Response {
    response::success(&ctx, Code::Success, "PONG!", None)
}
