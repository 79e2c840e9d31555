//! Request lifecycle stages.
//!
//! Outermost first:
//! 1. [`request_timeout`] attaches the [`RequestContext`] and bounds the request.
//! 2. [`recover`] turns a handler panic into an internal-error envelope.
//! 3. [`enrich_context`] copies caller headers into the context (application routes only).
//! 4. [`body_logger`] logs the request line and the response status (application routes only).

use std::panic::AssertUnwindSafe;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;

use crate::AppState;
use crate::api::response;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::scheduler::wrapper::panic_message;

/// Create the request context and bound the request by `server.timeout_ms`.
///
/// When the deadline passes the handler future is dropped and the client
/// receives a deadline-exceeded envelope.
pub async fn request_timeout(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let timeout = state.config.server.request_timeout();
    let (mut parts, body) = req.into_parts();

    let mut ctx = RequestContext::from_parts(&parts, &state.config.meta.host);
    ctx.set_timeout(timeout);
    parts.extensions.insert(ctx.clone());

    match tokio::time::timeout(timeout, next.run(Request::from_parts(parts, body))).await {
        Ok(response) => response,
        Err(_) => response::error(&ctx, AppError::deadline_exceeded()),
    }
}

/// Convert a panic anywhere below this stage into an internal-error envelope.
pub async fn recover(req: Request, next: Next) -> Response {
    let ctx = match req.extensions().get::<RequestContext>() {
        Some(ctx) => ctx.clone(),
        None => {
            let mut ctx = RequestContext::new();
            ctx.resolve_request_id(req.headers());
            ctx
        }
    };

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(
                request_id = %ctx.request_id(),
                "Recovered from panic in {} {}: {}",
                ctx.method(),
                ctx.uri(),
                message
            );
            response::error(&ctx, AppError::internal(format!("panic: {message}")))
        }
    }
}

/// Copy request id, user agent, locale, device type and cache hints into the
/// context, and stamp `meta.version`.
pub async fn enrich_context(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let version = &state.config.meta.version;
    let (mut parts, body) = req.into_parts();

    if let Some(ctx) = parts.extensions.get_mut::<RequestContext>() {
        ctx.enrich(&parts.headers, version);
    } else {
        let mut ctx = RequestContext::from_parts(&parts, &state.config.meta.host);
        ctx.enrich(&parts.headers, version);
        parts.extensions.insert(ctx);
    }

    next.run(Request::from_parts(parts, body)).await
}

/// Log the inbound request line and the outbound status.
///
/// Each half is toggled by `server.log_request` / `server.log_response`.
pub async fn body_logger(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let server = &state.config.server;
    let method = req.method().clone();
    let uri = req.uri().clone();
    let request_id = req
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id().to_string())
        .unwrap_or_default();

    if server.log_request {
        tracing::info!(
            request_id = %request_id,
            "httpclient Sent Request: uri={} method={}",
            uri,
            method
        );
    }

    let response = next.run(req).await;

    if server.log_response {
        let status = response.status();
        if status.is_success() {
            tracing::info!(
                request_id = %request_id,
                "httpclient Received Response: uri={} method={} resp_code={}",
                uri,
                method,
                status.as_u16()
            );
        } else {
            tracing::error!(
                request_id = %request_id,
                "httpclient Received Response: uri={} method={} resp_code={}",
                uri,
                method,
                status.as_u16()
            );
        }
    }

    response
}
