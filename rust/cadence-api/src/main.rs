//! Cadence API - Main Entry Point
//!
//! Loads configuration, registers the scheduled tasks, starts the scheduler
//! and serves HTTP until Ctrl+C or SIGTERM.

use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;

use cadence_api::AppState;
use cadence_api::config::AppConfig;
use cadence_api::gateway::{AuthService, JwtAuth};
use cadence_api::logging::init_tracing;
use cadence_api::server::{HttpServer, create_app, shutdown_signal};
use cadence_api::tasks::build_scheduler;

// Use mimalloc for better performance
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Command-line arguments. Values given here override the config file and
/// `CADENCE__*` variables.
#[derive(Parser, Debug)]
#[command(name = "cadence-api")]
#[command(about = "Cadence API - HTTP service with an in-process task scheduler")]
#[command(version)]
struct Args {
    /// Host to bind to.
    #[arg(long, env = "CADENCE_API_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "CADENCE_API_PORT")]
    port: Option<u16>,

    /// Log level, used when RUST_LOG is unset.
    #[arg(long, env = "CADENCE_API_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, env = "CADENCE_API_LOG_JSON")]
    log_json: bool,

    /// Config file path.
    #[arg(short, long, env = "CADENCE_API_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration before tracing so the configured level applies
    let loaded = AppConfig::load_from(args.config.as_deref());
    let (level, json) = match &loaded {
        Ok(config) => (
            args.log_level.clone().unwrap_or_else(|| config.logging.level.clone()),
            args.log_json || config.logging.json,
        ),
        Err(_) => (args.log_level.clone().unwrap_or_else(|| "info".to_string()), args.log_json),
    };
    init_tracing(&level, json)?;

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let config = Arc::new(config);

    tracing::info!("Starting Cadence API v{}", env!("CARGO_PKG_VERSION"));

    let auth: Arc<dyn AuthService> = Arc::new(JwtAuth::from_config(&config.gateway));

    // Registration errors are fatal: nothing is served with a broken schedule
    let scheduler = match build_scheduler(&config, Arc::clone(&auth), []) {
        Ok(scheduler) => Arc::new(scheduler),
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    scheduler.run()?;

    let app = create_app(AppState::new(
        Arc::clone(&config),
        Arc::clone(&scheduler),
        auth,
    ));

    let server = HttpServer::bind(
        &config.server.bind_address(),
        app,
        config.server.shutdown_timeout(),
    )
    .await?;
    let served = server.serve_until(shutdown_signal()).await;

    scheduler.shutdown();
    if tokio::time::timeout(config.server.shutdown_timeout(), scheduler.wait())
        .await
        .is_err()
    {
        tracing::warn!("Scheduled runs were still in flight at exit");
    }

    if let Err(e) = served {
        tracing::error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}
