//! Cadence API - HTTP service with an in-process task scheduler
//!
//! The crate combines an HTTP front end with a cron-style scheduler:
//!
//! - **Scheduler**: named tasks on a daily or fixed-interval cadence, plus
//!   on-demand triggers over HTTP
//! - **Request pipeline**: per-request deadline, context enrichment,
//!   request/response logging and panic recovery
//! - **Uniform envelopes**: every response carries localized display text,
//!   metadata and the request id
//! - **Graceful shutdown**: in-flight requests drain within a bounded window
//!
//! # Architecture
//!
//! - [`config`]: Configuration loading and validation
//! - [`scheduler`]: Cadences, registry, cadence loops and the run wrapper
//! - [`tasks`]: The tasks the service ships with
//! - [`api`]: HTTP endpoints, middleware and the response envelope
//! - [`gateway`]: Bearer and basic authentication
//! - [`server`]: Router assembly and server lifecycle
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cadence_api::{AppState, config::AppConfig, gateway::JwtAuth, server, tasks};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(AppConfig::load()?);
//!     let auth = Arc::new(JwtAuth::from_config(&config.gateway));
//!     let scheduler = Arc::new(tasks::build_scheduler(&config, auth.clone(), [])?);
//!     scheduler.run()?;
//!
//!     let app = server::create_app(AppState::new(config.clone(), scheduler, auth));
//!     server::HttpServer::bind("0.0.0.0:8080", app, config.server.shutdown_timeout())
//!         .await?
//!         .serve_until(server::shutdown_signal())
//!         .await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod codes;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod scheduler;
pub mod server;
pub mod tasks;

use std::sync::Arc;

use config::AppConfig;
use gateway::AuthService;
use scheduler::Scheduler;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The task scheduler, for on-demand triggers.
    pub scheduler: Arc<Scheduler>,
    /// Token validation and identity stamping.
    pub auth: Arc<dyn AuthService>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        scheduler: Arc<Scheduler>,
        auth: Arc<dyn AuthService>,
    ) -> Self {
        Self {
            config,
            scheduler,
            auth,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"AppConfig")
            .field("scheduler", &self.scheduler.registry().names())
            .field("auth_required", &self.auth.requires_token())
            .finish()
    }
}
