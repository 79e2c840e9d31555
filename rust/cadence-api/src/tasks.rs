//! Scheduled tasks shipped with the service and their registration.

use std::sync::Arc;

use crate::config::{AppConfig, SchedulerConfig};
use crate::context::RequestContext;
use crate::gateway::AuthService;
use crate::scheduler::{RunObserver, Scheduler, SchedulerBuilder, SchedulerError, task_handler};

/// Default tag of the hello-world task.
pub const HELLO_WORLD: &str = "HelloWorld";

/// Greets the log on every run.
pub async fn hello_world(ctx: RequestContext) -> anyhow::Result<()> {
    tracing::info!(
        request_id = %ctx.request_id(),
        user_agent = %ctx.user_agent(),
        "Hello, 世界!"
    );
    Ok(())
}

/// Register every configured task on `builder`.
pub fn register_tasks(
    builder: &mut SchedulerBuilder,
    config: &SchedulerConfig,
) -> Result<(), SchedulerError> {
    builder.register_task(config.hello_world.to_spec(), task_handler(hello_world))
}

/// Build the scheduler for `config`. Nothing runs until [`Scheduler::run`].
pub fn build_scheduler(
    config: &AppConfig,
    auth: Arc<dyn AuthService>,
    observers: impl IntoIterator<Item = Arc<dyn RunObserver>>,
) -> Result<Scheduler, SchedulerError> {
    let mut builder = observers.into_iter().fold(
        Scheduler::builder(auth).with_service_version(&config.meta.version),
        SchedulerBuilder::with_observer,
    );
    register_tasks(&mut builder, &config.scheduler)?;
    builder.build()
}
