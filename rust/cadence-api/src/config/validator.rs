//! Configuration validation.
//!
//! Runs at startup so a broken configuration is rejected before the
//! scheduler or the listener starts. Every problem is reported at once.

use super::error::{ConfigResult, ConfigurationError};
use super::{AppConfig, RouteConfig, ServerConfig, TaskConfig};
use crate::scheduler::{Cadence, CadenceKind};

/// Checks an [`AppConfig`] for values the service cannot run with.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration.
    pub fn validate(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&config.server) {
            errors.push(e);
        }
        if let Err(e) = Self::validate_task(&config.scheduler.hello_world) {
            errors.push(e);
        }
        if let Err(e) = Self::validate_route("swagger", &config.swagger) {
            errors.push(e);
        }
        if let Err(e) = Self::validate_route("platform", &config.platform) {
            errors.push(e);
        }
        if config.swagger.enabled
            && config.platform.enabled
            && config.swagger.path == config.platform.path
        {
            errors.push(ConfigurationError::incompatible(
                format!("swagger.path={}", config.swagger.path),
                format!("platform.path={}", config.platform.path),
                "Both routes cannot be mounted on the same path. \
                Set CADENCE__SWAGGER__PATH or CADENCE__PLATFORM__PATH to a different value.",
            ));
        }

        ConfigurationError::collect(errors)
    }

    /// Validate timeouts.
    pub fn validate_server(server: &ServerConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if server.timeout_ms == 0 {
            errors.push(ConfigurationError::invalid(
                "server.timeout_ms must be greater than zero",
                "Set CADENCE__SERVER__TIMEOUT_MS to the per-request deadline in milliseconds",
            ));
        }
        if server.shutdown_timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "server.shutdown_timeout_secs must be greater than zero",
                "Set CADENCE__SERVER__SHUTDOWN_TIMEOUT_SECS to the drain window in seconds",
            ));
        }

        ConfigurationError::collect(errors)
    }

    /// Validate one scheduled task. Disabled tasks are not checked.
    pub fn validate_task(task: &TaskConfig) -> ConfigResult<()> {
        if !task.enabled {
            return Ok(());
        }
        if task.name.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "scheduled task name must not be empty",
                "Set a unique name for every enabled scheduled task",
            ));
        }

        Cadence::from_spec(&task.to_spec()).map(drop).map_err(|e| {
            let fix_hint = match task.cadence {
                CadenceKind::Daily => "Set time_of_day to a UTC time in HH:MM format, e.g. \"09:30\"",
                CadenceKind::Interval => "Set interval_secs to a positive number of seconds",
            };
            ConfigurationError::invalid(e.to_string(), fix_hint)
        })
    }

    /// Validate a basic-auth guarded route.
    pub fn validate_route(name: &str, route: &RouteConfig) -> ConfigResult<()> {
        if !route.enabled {
            return Ok(());
        }
        let mut errors = Vec::new();
        let env_prefix = format!("CADENCE__{}", name.to_uppercase());

        if !route.path.starts_with('/') {
            errors.push(ConfigurationError::invalid(
                format!("{name}.path {:?} must start with '/'", route.path),
                format!("Set {env_prefix}__PATH to an absolute path such as \"/{name}\""),
            ));
        }
        if route.basic_auth.username.is_empty() || route.basic_auth.password.is_empty() {
            errors.push(ConfigurationError::missing_required(
                format!("{name} basic auth credentials"),
                format!("Protecting the {name} route"),
                format!("{env_prefix}__BASIC_AUTH__USERNAME and {env_prefix}__BASIC_AUTH__PASSWORD"),
            ));
        }

        ConfigurationError::collect(errors)
    }
}
