//! Request-scoped execution context.
//!
//! Every HTTP request and every scheduler run owns exactly one
//! [`RequestContext`]. The request pipeline stores it in the request
//! extensions; handlers pull it back out with the extractor impl below and
//! pass it by reference to the response composer.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying the request identifier, inbound and outbound.
pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Header carrying the caller's device type.
pub const HEADER_DEVICE_TYPE: &str = "x-device-type";

/// Build version, the default for `meta.version`.
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reserved actor id for scheduler-originated runs.
pub const SYSTEM_ID: i64 = -1;

/// Reserved actor name for scheduler-originated runs.
pub const SYSTEM_NAME: &str = "system";

/// Identity of whoever a request or run acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Numeric user id. Negative ids are reserved.
    pub id: i64,
    /// Display name.
    pub name: String,
}

impl Actor {
    /// Create an actor for an authenticated user.
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The sentinel identity attached to scheduler runs.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_ID, SYSTEM_NAME)
    }

    /// Whether this is the sentinel system identity.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_ID && self.name == SYSTEM_NAME
    }
}

/// Per-request (or per-run) context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: String,
    user_agent: String,
    accept_language: String,
    device_type: String,
    cache_control: String,
    service_version: String,
    method: String,
    uri: String,
    path: String,
    started_at: Option<Instant>,
    deadline: Option<Instant>,
    actor: Option<Actor>,
}

impl RequestContext {
    /// A context with no request data and no id yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh context for one scheduler run of `task_name`.
    #[must_use]
    pub fn for_scheduler(task_name: &str, service_version: &str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            user_agent: format!("Cron Scheduler : {task_name}"),
            service_version: service_version.to_string(),
            started_at: Some(Instant::now()),
            ..Self::default()
        }
    }

    /// Build the base context for an inbound request.
    ///
    /// `host` is prepended to the request URI to form the envelope path.
    #[must_use]
    pub fn from_parts(parts: &Parts, host: &str) -> Self {
        let uri = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);

        let mut ctx = Self {
            method: parts.method.to_string(),
            path: format!("{host}{uri}"),
            uri,
            started_at: Some(Instant::now()),
            ..Self::default()
        };
        ctx.resolve_request_id(&parts.headers);
        ctx.accept_language = header_value(&parts.headers, header::ACCEPT_LANGUAGE.as_str());
        ctx
    }

    /// Copy the caller-describing headers and the configured service version
    /// into the context.
    ///
    /// The request id is only assigned when the context does not carry one yet,
    /// so an id minted by an earlier stage is kept.
    pub fn enrich(&mut self, headers: &HeaderMap, service_version: &str) {
        self.resolve_request_id(headers);
        self.user_agent = header_value(headers, header::USER_AGENT.as_str());
        self.accept_language = header_value(headers, header::ACCEPT_LANGUAGE.as_str());
        self.device_type = header_value(headers, HEADER_DEVICE_TYPE);
        self.cache_control = header_value(headers, header::CACHE_CONTROL.as_str());
        self.service_version = service_version.to_string();
    }

    /// Reuse the inbound `X-Request-Id` or mint a UUID, if no id is set.
    pub fn resolve_request_id(&mut self, headers: &HeaderMap) {
        if !self.request_id.is_empty() {
            return;
        }
        let inbound = header_value(headers, HEADER_REQUEST_ID);
        self.request_id = if inbound.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            inbound
        };
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn set_request_id(&mut self, request_id: impl Into<String>) {
        self.request_id = request_id.into();
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn accept_language(&self) -> &str {
        &self.accept_language
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn cache_control(&self) -> &str {
        &self.cache_control
    }

    pub fn service_version(&self) -> &str {
        &self.service_version
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// `host + uri` as shown in the envelope metadata.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The authenticated (or system) actor, if any.
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn set_actor(&mut self, actor: Actor) {
        self.actor = Some(actor);
    }

    /// Record the request start time.
    pub fn mark_started(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Time since the start time was recorded.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| start.elapsed())
    }

    /// Bound the context by `timeout` from now.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline attached by the timeout stage has passed.
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let mut ctx = parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_parts(parts, ""));
        ctx.resolve_request_id(&parts.headers);
        Ok(ctx)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
