//! HTTP API endpoints.

pub mod docs;
pub mod health;
pub mod middleware;
pub mod platform;
pub mod response;
pub mod scheduler;

use axum::{Router, middleware::from_fn_with_state, response::Response};

use crate::AppState;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::gateway::auth::bearer_auth;

/// Create the API router.
///
/// Health, ping, docs and platform routes sit outside the application group
/// and skip context enrichment and body logging. The scheduler admin routes
/// require a bearer token when a JWT secret is configured.
pub fn create_router(state: &AppState) -> Router<AppState> {
    let mut admin = scheduler::router();
    if state.auth.requires_token() {
        admin = admin.route_layer(from_fn_with_state(state.clone(), bearer_auth));
    }

    let application = admin
        .layer(from_fn_with_state(state.clone(), middleware::body_logger))
        .layer(from_fn_with_state(state.clone(), middleware::enrich_context));

    let mut router = Router::new()
        .merge(health::router())
        .merge(health::ping_router())
        .merge(application);

    let config = &state.config;
    if config.swagger.enabled {
        router = router.merge(docs::router(&config.swagger));
    }
    if config.platform.enabled {
        router = router.merge(platform::router(&config.platform));
    }

    router.fallback(route_not_found)
}

async fn route_not_found(ctx: RequestContext) -> Response {
    response::error(
        &ctx,
        AppError::not_found(format!("no route for {} {}", ctx.method(), ctx.uri())),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::AppState;
    use crate::config::AppConfig;
    use crate::gateway::{AuthService, JwtAuth};
    use crate::logging::capture;
    use crate::server::create_app;
    use crate::tasks::build_scheduler;

    fn app() -> axum::Router {
        let config = AppConfig::default();
        let auth: Arc<dyn AuthService> = Arc::new(JwtAuth::disabled());
        let scheduler = build_scheduler(&config, Arc::clone(&auth), []).unwrap();
        create_app(AppState::new(Arc::new(config), Arc::new(scheduler), auth))
    }

    #[tokio::test]
    async fn test_ping_skips_application_group() {
        let app = app();
        let (capture, _guard) = capture::install();

        let response = app
            .clone()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert!(capture.matching("httpclient").is_empty());

        let response = app
            .oneshot(
                Request::post("/v1/admin/scheduler/trigger")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"HelloWorld"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(capture.matching("httpclient").len(), 2);
    }
}
