//! HTTP basic auth for the documentation and platform routes.

use axum::{
    RequestPartsExt,
    extract::{Request, State},
    http::{HeaderValue, header::WWW_AUTHENTICATE},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use crate::api::response;
use crate::config::BasicAuthConfig;
use crate::context::RequestContext;
use crate::error::AppError;

/// Reject requests whose basic credentials do not match `credentials`.
///
/// Empty configured credentials match nothing.
pub async fn basic_auth(
    State(credentials): State<BasicAuthConfig>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let authorized = match parts.extract::<TypedHeader<Authorization<Basic>>>().await {
        Ok(TypedHeader(authorization)) => matches(&credentials, &authorization),
        Err(_) => false,
    };

    if authorized {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let Ok(ctx) = parts.extract::<RequestContext>().await;
    let mut response = response::error(&ctx, AppError::unauthorized("invalid basic auth credentials"));
    response.headers_mut().insert(
        WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Restricted\""),
    );
    response
}

fn matches(credentials: &BasicAuthConfig, authorization: &Authorization<Basic>) -> bool {
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return false;
    }
    // Both comparisons always run
    let username = constant_time_eq(
        authorization.username().as_bytes(),
        credentials.username.as_bytes(),
    );
    let password = constant_time_eq(
        authorization.password().as_bytes(),
        credentials.password.as_bytes(),
    );
    username & password
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}
