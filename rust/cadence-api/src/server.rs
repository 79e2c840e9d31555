//! HTTP server setup, middleware and lifecycle.
//!
//! [`create_app`] assembles the router and the request pipeline.
//! [`HttpServer`] owns the listener and moves through
//! `Starting → Serving → Draining → Stopped`; a drain that outlives the
//! shutdown window is reported as [`ServerError::ShutdownTimeout`].

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    middleware::{from_fn, from_fn_with_state},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{self, middleware};
use crate::config::CorsMode;
use crate::context::HEADER_REQUEST_ID;
use crate::logging::OpTimer;
use crate::{AppState, log_banner, log_init_step, log_init_warning, log_success};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create the application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let overall_timer = OpTimer::new("server", "create_app");
    let config = state.config.clone();

    log_banner!(
        format!("{} v{}", config.meta.title, VERSION),
        format!(
            "Timeout: {:?} | Drain window: {:?}",
            config.server.request_timeout(),
            config.server.shutdown_timeout()
        )
    );

    // [1/4] Scheduler
    let names = state.scheduler.registry().names();
    log_init_step!(
        1,
        4,
        "Scheduler",
        format!("{} task(s) [{}]", names.len(), names.join(", "))
    );

    // [2/4] Auth
    if state.auth.requires_token() {
        log_init_step!(2, 4, "Auth", "Bearer JWT required on admin routes");
    } else {
        log_init_step!(2, 4, "Auth", "Admin routes open");
        log_init_warning!("No JWT secret configured. Set JWT_SECRET to protect admin routes.");
    }

    // [3/4] Docs and platform routes
    let docs_info = format!(
        "swagger: {} | platform: {}",
        route_info(config.swagger.enabled, &config.swagger.path),
        route_info(config.platform.enabled, &config.platform.path)
    );
    log_init_step!(3, 4, "Docs", docs_info);

    // [4/4] Router and middleware
    let step_timer = OpTimer::new("server", "router");
    let app = api::create_router(&state)
        .layer(from_fn(middleware::recover))
        .layer(from_fn_with_state(state.clone(), middleware::request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config.server.cors.mode))
        .with_state(state);
    log_init_step!(4, 4, "Router", format!("CORS mode {:?}", config.server.cors.mode));
    step_timer.finish();

    overall_timer.finish();
    log_success!("{} created successfully", config.meta.title);

    app
}

fn route_info(enabled: bool, path: &str) -> String {
    if enabled {
        path.to_string()
    } else {
        "disabled".to_string()
    }
}

/// Build the CORS layer for `mode`.
pub fn cors_layer(mode: CorsMode) -> CorsLayer {
    match mode {
        CorsMode::AllowAll => CorsLayer::permissive(),
        CorsMode::Default => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::HEAD,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::ORIGIN,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::ACCEPT_LANGUAGE,
                header::AUTHORIZATION,
                header::CACHE_CONTROL,
                HeaderName::from_static(HEADER_REQUEST_ID),
            ])
            .expose_headers([HeaderName::from_static(HEADER_REQUEST_ID)]),
    }
}

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

/// Server failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// In-flight requests were still running when the drain window closed.
    #[error("server forced to shutdown: drain exceeded {0:?}")]
    ShutdownTimeout(Duration),
}

/// An HTTP server bound to a listener.
#[derive(Debug)]
pub struct HttpServer {
    listener: TcpListener,
    app: Router,
    shutdown_timeout: Duration,
    state: watch::Sender<ServerState>,
}

impl HttpServer {
    /// Bind `addr` and prepare to serve `app`.
    pub async fn bind(addr: &str, app: Router, shutdown_timeout: Duration) -> Result<Self, ServerError> {
        let timer = OpTimer::new("server", "bind");
        let listener = TcpListener::bind(addr).await;
        timer.finish_with_result(listener.as_ref());

        let listener = listener.map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        Ok(Self::from_listener(listener, app, shutdown_timeout))
    }

    /// Serve `app` on an already bound listener.
    #[must_use]
    pub fn from_listener(listener: TcpListener, app: Router, shutdown_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ServerState::Starting);
        Self {
            listener,
            app,
            shutdown_timeout,
            state,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Watch the lifecycle state.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Serve until `signal` resolves, then drain within the shutdown window.
    ///
    /// New connections are refused once draining starts. If requests are
    /// still running when the window closes they are abandoned and the call
    /// fails with [`ServerError::ShutdownTimeout`]; the caller is expected
    /// to exit.
    pub async fn serve_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            listener,
            app,
            shutdown_timeout,
            state,
        } = self;

        let addr = listener
            .local_addr()
            .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
        let drain = CancellationToken::new();
        let mut server = tokio::spawn(
            axum::serve(listener, app)
                .with_graceful_shutdown(drain.clone().cancelled_owned())
                .into_future(),
        );

        state.send_replace(ServerState::Serving);
        tracing::info!(addr = %addr, "Listening and Serving HTTP on {}", addr);

        tokio::select! {
            result = &mut server => {
                state.send_replace(ServerState::Stopped);
                return result?.map_err(ServerError::Serve);
            }
            () = signal => {}
        }

        tracing::info!("Shutting down server...");
        state.send_replace(ServerState::Draining);
        drain.cancel();

        match tokio::time::timeout(shutdown_timeout, &mut server).await {
            Ok(result) => {
                state.send_replace(ServerState::Stopped);
                result?.map_err(ServerError::Serve)?;
                tracing::info!("Server Shut Down.");
                Ok(())
            }
            Err(_) => {
                server.abort();
                state.send_replace(ServerState::Stopped);
                tracing::error!(
                    timeout_ms = u64::try_from(shutdown_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Server forced to shutdown: drain exceeded {:?}",
                    shutdown_timeout
                );
                Err(ServerError::ShutdownTimeout(shutdown_timeout))
            }
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
