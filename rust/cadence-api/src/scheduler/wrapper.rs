//! Job execution wrapper.
//!
//! Every scheduled or triggered run goes through [`WrappedTask::call`]. It
//! builds a fresh system-identity context, runs the handler, logs the outcome
//! and reports it to the observers. Handler errors and panics stop here: the
//! scheduler never sees them.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::{Actor, RequestContext, SERVICE_VERSION};
use crate::gateway::auth::AuthService;

/// Future returned by a task handler.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A task handler: `f(ctx) -> error`.
pub type TaskHandler = Arc<dyn Fn(RequestContext) -> TaskFuture + Send + Sync>;

/// Box an async fn or closure into a [`TaskHandler`].
pub fn task_handler<F, Fut>(f: F) -> TaskHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// What caused a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrigin {
    /// The job's cadence came due.
    Cadence,
    /// An explicit trigger by name.
    Trigger,
}

impl fmt::Display for RunOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cadence => write!(f, "cadence"),
            Self::Trigger => write!(f, "trigger"),
        }
    }
}

/// Result of one run, as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub task: String,
    pub request_id: String,
    pub origin: RunOrigin,
    pub elapsed: Duration,
    /// `None` on success, otherwise the handler error or panic message.
    pub error: Option<String>,
}

impl RunOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Receives the outcome of every run.
pub trait RunObserver: Send + Sync {
    fn on_run_complete(&self, outcome: &RunOutcome);
}

impl<F> RunObserver for F
where
    F: Fn(&RunOutcome) + Send + Sync,
{
    fn on_run_complete(&self, outcome: &RunOutcome) {
        self(outcome);
    }
}

/// A task handler bound to its name, the auth collaborator and observers.
#[derive(Clone)]
pub struct WrappedTask {
    name: Arc<str>,
    service_version: Arc<str>,
    handler: TaskHandler,
    auth: Arc<dyn AuthService>,
    observers: Arc<[Arc<dyn RunObserver>]>,
}

impl fmt::Debug for WrappedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedTask")
            .field("name", &self.name)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl WrappedTask {
    #[must_use]
    pub fn new(
        name: &str,
        handler: TaskHandler,
        auth: Arc<dyn AuthService>,
        observers: Arc<[Arc<dyn RunObserver>]>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            service_version: Arc::from(SERVICE_VERSION),
            handler,
            auth,
            observers,
        }
    }

    /// Stamp `version` into every run context instead of the build version.
    #[must_use]
    pub fn with_service_version(mut self, version: &str) -> Self {
        self.service_version = Arc::from(version);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the handler once. Never fails; the outcome is returned and
    /// published to every observer.
    pub async fn call(&self, origin: RunOrigin) -> RunOutcome {
        let mut ctx = RequestContext::for_scheduler(&self.name, &self.service_version);
        self.auth.set_user_auth_info(&mut ctx, Actor::system());
        let request_id = ctx.request_id().to_string();

        tracing::info!(
            task = %self.name,
            request_id = %request_id,
            origin = %origin,
            "Running scheduler {} is running",
            self.name
        );

        let start = Instant::now();
        let handler = Arc::clone(&self.handler);
        let result = AssertUnwindSafe(async move { handler(ctx).await })
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(())) => {
                tracing::info!(
                    task = %self.name,
                    request_id = %request_id,
                    "Running scheduler {} success",
                    self.name
                );
                None
            }
            Ok(Err(err)) => {
                tracing::error!(
                    task = %self.name,
                    request_id = %request_id,
                    "Running scheduler {} error: {:#}",
                    self.name,
                    err
                );
                Some(format!("{err:#}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    task = %self.name,
                    request_id = %request_id,
                    "Running scheduler {} error: panicked: {}",
                    self.name,
                    message
                );
                Some(format!("panicked: {message}"))
            }
        };

        let elapsed = start.elapsed();
        tracing::info!(
            task = %self.name,
            request_id = %request_id,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Scheduler {} done in {:?}",
            self.name,
            elapsed
        );

        let outcome = RunOutcome {
            task: self.name.to_string(),
            request_id,
            origin,
            elapsed,
            error,
        };
        for observer in self.observers.iter() {
            observer.on_run_complete(&outcome);
        }
        outcome
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
