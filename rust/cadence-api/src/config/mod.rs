//! Configuration management for the service.
//!
//! Configuration is loaded from defaults, optional config files and
//! `CADENCE__*` environment variables, then validated.
//!
//! ```rust,ignore
//! use cadence_api::config::{AppConfig, ConfigValidator};
//!
//! let config = AppConfig::load()?;
//! ConfigValidator::validate(&config)?;
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::{CadenceKind, TaskSpec};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Service metadata shown in responses and API docs.
    #[serde(default)]
    pub meta: MetaConfig,
    /// Scheduled tasks.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Gateway configuration (bearer auth).
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// OpenAPI document route.
    #[serde(default = "default_swagger")]
    pub swagger: RouteConfig,
    /// Effective-configuration route.
    #[serde(default = "default_platform")]
    pub platform: RouteConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            meta: MetaConfig::default(),
            scheduler: SchedulerConfig::default(),
            gateway: GatewayConfig::default(),
            swagger: default_swagger(),
            platform: default_platform(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and config files, then validate it.
    ///
    /// Sources, lowest precedence first:
    /// 1. Default values
    /// 2. Config files (`config/cadence-api.*`, `config/cadence.*`, then `path` if given)
    /// 3. Environment variables (`CADENCE__SECTION__KEY`)
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(None)
    }

    /// Like [`Self::load`], with an extra required config file.
    pub fn load_from(path: Option<&str>) -> anyhow::Result<Self> {
        let config = Self::load_unchecked(path)?;

        ConfigValidator::validate(&config)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked(path: Option<&str>) -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .add_source(config::File::with_name("config/cadence-api").required(false))
            .add_source(config::File::with_name("config/cadence").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CADENCE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        // Gateway secrets
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            app_config.gateway.jwt_secret = Some(secret);
        }

        Ok(app_config)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Drain window for graceful shutdown, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
    /// Log every inbound request line.
    #[serde(default = "default_true")]
    pub log_request: bool,
    /// Log every outbound response status.
    #[serde(default = "default_true")]
    pub log_response: bool,
    /// CORS policy.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            log_request: true,
            log_response: true,
            cors: CorsConfig::default(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub mode: CorsMode,
}

/// CORS policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorsMode {
    /// Any origin, method and header.
    AllowAll,
    /// Any origin with the standard methods and headers.
    #[default]
    Default,
}

/// Service metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// Prepended to the request URI in `metadata.path`.
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_title() -> String {
    "Cadence API".to_string()
}

fn default_description() -> String {
    "HTTP service with an in-process task scheduler".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_version() -> String {
    crate::context::SERVICE_VERSION.to_string()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            host: String::new(),
            base_path: default_base_path(),
            version: default_version(),
        }
    }
}

/// Scheduled task configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_hello_world")]
    pub hello_world: TaskConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            hello_world: default_hello_world(),
        }
    }
}

fn default_hello_world() -> TaskConfig {
    TaskConfig {
        name: crate::tasks::HELLO_WORLD.to_string(),
        enabled: true,
        cadence: CadenceKind::Interval,
        interval_secs: 300,
        time_of_day: String::new(),
    }
}

/// One scheduled task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique tag.
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// `daily` or `interval`. Any other value fails to load.
    #[serde(default)]
    pub cadence: CadenceKind,
    /// Period for `interval` tasks.
    #[serde(default)]
    pub interval_secs: u64,
    /// `HH:MM` UTC for `daily` tasks.
    #[serde(default)]
    pub time_of_day: String,
}

impl TaskConfig {
    #[must_use]
    pub fn to_spec(&self) -> TaskSpec {
        TaskSpec {
            name: self.name.clone(),
            enabled: self.enabled,
            kind: self.cadence,
            interval: Duration::from_secs(self.interval_secs),
            time_of_day: self.time_of_day.clone(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// JWT secret for token validation. Admin routes are open without it.
    #[serde(default, skip_serializing)]
    pub jwt_secret: Option<String>,
    /// JWT expiration in seconds for issued tokens.
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_secs: u64,
}

fn default_jwt_expiry() -> u64 {
    86400 // 24 hours
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiry_secs: default_jwt_expiry(),
        }
    }
}

/// An operator route. When enabled it always sits behind basic auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default)]
    pub enabled: bool,
    pub path: String,
    #[serde(default)]
    pub basic_auth: BasicAuthConfig,
}

fn default_swagger() -> RouteConfig {
    RouteConfig {
        enabled: false,
        path: "/swagger".to_string(),
        basic_auth: BasicAuthConfig::default(),
    }
}

fn default_platform() -> RouteConfig {
    RouteConfig {
        enabled: false,
        path: "/platform".to_string(),
        basic_auth: BasicAuthConfig::default(),
    }
}

/// Basic auth credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.shutdown_timeout(), Duration::from_secs(10));
        assert!(config.server.log_request);
        assert_eq!(config.server.cors.mode, CorsMode::Default);
        assert_eq!(config.scheduler.hello_world.name, "HelloWorld");
        assert_eq!(config.platform.path, "/platform");
        assert!(!config.platform.enabled);
        assert_eq!(config.swagger.path, "/swagger");
        assert!(!config.swagger.enabled);
    }

    #[test]
    fn test_task_config_to_spec() {
        let task = TaskConfig {
            name: "Nightly".to_string(),
            enabled: true,
            cadence: CadenceKind::Daily,
            interval_secs: 0,
            time_of_day: "02:30".to_string(),
        };
        let spec = task.to_spec();
        assert_eq!(spec.kind, CadenceKind::Daily);
        assert_eq!(spec.time_of_day, "02:30");
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = AppConfig::default();
        config.gateway.jwt_secret = Some("top-secret".to_string());
        config.platform.basic_auth.password = "hunter2".to_string();

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("top-secret"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090
timeout_ms = 250
log_response = false

[scheduler.hello_world]
name = "HelloWorld"
enabled = true
cadence = "daily"
time_of_day = "08:00"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path().to_str()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.request_timeout(), Duration::from_millis(250));
        assert!(!config.server.log_response);
        assert_eq!(config.scheduler.hello_world.cadence, CadenceKind::Daily);
    }

    #[test]
    #[serial]
    fn test_unknown_cadence_kind_fails_to_load() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[scheduler.hello_world]
name = "HelloWorld"
enabled = true
cadence = "weekly"
"#
        )
        .unwrap();

        assert!(AppConfig::load_unchecked(file.path().to_str()).is_err());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        // SAFETY: guarded by #[serial]; no other test touches the environment concurrently.
        unsafe {
            std::env::set_var("CADENCE__SERVER__TIMEOUT_MS", "1500");
        }
        let config = AppConfig::load_unchecked(None);
        // SAFETY: as above.
        unsafe {
            std::env::remove_var("CADENCE__SERVER__TIMEOUT_MS");
        }

        assert_eq!(config.unwrap().server.timeout_ms, 1500);
    }
}
