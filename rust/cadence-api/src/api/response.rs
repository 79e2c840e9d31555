//! Canonical response envelope.
//!
//! Every handler answers through [`success`] or [`error`], so clients always
//! receive the same shape:
//!
//! ```json
//! {
//!   "message": { "title": "Success", "body": "Request successful." },
//!   "metadata": {
//!     "path": "/ping",
//!     "statusCode": 200,
//!     "status": "OK",
//!     "message": "GET /ping [200] OK",
//!     "timestamp": "2026-01-01T00:00:00+00:00",
//!     "requestId": "9b2d...",
//!     "timeElapsed": "0ms"
//!   },
//!   "data": "PONG!"
//! }
//! ```

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::codes::{Code, DisplayMessage, Language};
use crate::context::{HEADER_REQUEST_ID, RequestContext};
use crate::error::AppError;

/// Response body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Envelope {
    /// Localized title and body for the result code.
    pub message: DisplayMessage,
    #[serde(rename = "metadata")]
    pub meta: Meta,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Request and result metadata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Configured host followed by the request URI.
    pub path: String,
    pub status_code: u16,
    pub status: String,
    /// `"<METHOD> <URI> [<status>] <status text>"`.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MetaError>,
    /// RFC 3339.
    pub timestamp: String,
    pub request_id: String,
    /// `"<n>ms"`, present when the request start was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_elapsed: Option<String>,
}

/// Raw error details for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetaError {
    pub code: u32,
    pub message: String,
}

/// Page information for list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub current_elements: u64,
    pub total_pages: u64,
    pub total_elements: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sort_by: String,
}

impl Meta {
    fn new(ctx: &RequestContext, status: StatusCode, error: Option<MetaError>) -> Self {
        let status_text = status.canonical_reason().unwrap_or_default();
        Self {
            path: ctx.path().to_string(),
            status_code: status.as_u16(),
            status: status_text.to_string(),
            message: format!(
                "{} {} [{}] {}",
                ctx.method(),
                ctx.uri(),
                status.as_u16(),
                status_text
            ),
            error,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id: ctx.request_id().to_string(),
            time_elapsed: ctx
                .elapsed()
                .map(|elapsed| format!("{}ms", elapsed.as_millis())),
        }
    }
}

/// Compose a success envelope for `data`.
///
/// If `data` cannot be serialized the request fails with an internal error instead.
pub fn success<T: Serialize>(
    ctx: &RequestContext,
    code: Code,
    data: T,
    pagination: Option<Pagination>,
) -> Response {
    let data = match serde_json::to_value(data) {
        Ok(data) => data,
        Err(e) => {
            return error(
                ctx,
                AppError::internal(format!("failed to serialize response data: {e}")),
            );
        }
    };

    let language = Language::from_accept_language(ctx.accept_language());
    let status = code.status();
    let envelope = Envelope {
        message: code.display(language),
        meta: Meta::new(ctx, status, None),
        data,
        pagination,
    };

    respond(ctx, code, status, envelope)
}

/// Compose an error envelope for `err`.
///
/// A request whose deadline has passed is always reported as
/// [`Code::ContextDeadlineExceeded`], whatever the handler returned.
pub fn error(ctx: &RequestContext, err: AppError) -> Response {
    tracing::error!(
        request_id = %ctx.request_id(),
        code = err.code().as_u32(),
        "{} {} failed: {}",
        ctx.method(),
        ctx.uri(),
        err
    );

    let err = if ctx.deadline_exceeded() {
        AppError::deadline_exceeded()
    } else {
        err
    };

    let language = Language::from_accept_language(ctx.accept_language());
    let code = err.code();
    let status = code.status();
    let envelope = Envelope {
        message: err.display(language),
        meta: Meta::new(
            ctx,
            status,
            Some(MetaError {
                code: code.as_u32(),
                message: err.message().to_string(),
            }),
        ),
        data: serde_json::Value::Null,
        pagination: None,
    };

    respond(ctx, code, status, envelope)
}

/// A `200` raw-body response outside the envelope, e.g. a YAML export.
pub fn raw(ctx: &RequestContext, content_type: &'static str, body: String) -> Response {
    let response = ([(CONTENT_TYPE, content_type)], body).into_response();
    stamp(ctx, Code::Success, response)
}

fn respond(ctx: &RequestContext, code: Code, status: StatusCode, envelope: Envelope) -> Response {
    stamp(ctx, code, (status, Json(envelope)).into_response())
}

fn stamp(ctx: &RequestContext, code: Code, mut response: Response) -> Response {
    if let Ok(request_id) = HeaderValue::from_str(ctx.request_id()) {
        response.headers_mut().insert(HEADER_REQUEST_ID, request_id);
    }
    response.extensions_mut().insert(code);
    response
}
