//! Scheduler admin endpoints.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::Response,
    routing::post,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;
use crate::api::response;
use crate::codes::Code;
use crate::context::RequestContext;
use crate::error::AppError;

/// Create the scheduler admin router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/admin/scheduler/trigger", post(trigger_scheduler))
}

/// Trigger request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriggerSchedulerParams {
    /// Tag of the scheduled task to run.
    #[serde(default)]
    pub name: String,
}

/// Run a scheduled task now and wait for it to finish.
///
/// Task failures are logged by the scheduler and do not change the response.
#[utoipa::path(
    post,
    path = "/v1/admin/scheduler/trigger",
    tag = "scheduler",
    request_body = TriggerSchedulerParams,
    responses(
        (status = 200, description = "Task ran to completion", body = crate::api::response::Envelope),
        (status = 400, description = "Malformed body or missing name", body = crate::api::response::Envelope),
        (status = 401, description = "Missing or invalid bearer token", body = crate::api::response::Envelope),
        (status = 404, description = "No task with that name", body = crate::api::response::Envelope),
        (status = 408, description = "Request deadline exceeded", body = crate::api::response::Envelope)
    ),
    security(("bearer_auth" = []))
)]
pub async fn trigger_scheduler(
    ctx: RequestContext,
    State(state): State<AppState>,
    payload: Result<Json<TriggerSchedulerParams>, JsonRejection>,
) -> Response {
    let params = match payload {
        Ok(Json(params)) => params,
        Err(rejection) => return response::error(&ctx, AppError::bad_request(rejection.body_text())),
    };

    let name = params.name.trim();
    if name.is_empty() {
        return response::error(&ctx, AppError::bad_request("name is required"));
    }

    match state.scheduler.trigger_by_name(name).await {
        Ok(outcome) => {
            tracing::info!(
                request_id = %ctx.request_id(),
                run_request_id = %outcome.request_id,
                success = outcome.is_success(),
                "Triggered scheduler {} finished",
                name
            );
            response::success(&ctx, Code::Success, (), None)
        }
        Err(err) => response::error(&ctx, err.into()),
    }
}
