//! Scheduler engine: registration, cadence loops and on-demand triggers.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{
    Cadence, Job, JobRegistry, RunObserver, RunOrigin, RunOutcome, SchedulerError, TaskHandler,
    TaskSpec, WrappedTask,
};
use crate::context::SERVICE_VERSION;
use crate::gateway::auth::AuthService;

struct PendingTask {
    spec: TaskSpec,
    cadence: Cadence,
    handler: TaskHandler,
    registered_at: Instant,
}

/// Collects tasks during startup and produces a [`Scheduler`].
pub struct SchedulerBuilder {
    auth: Arc<dyn AuthService>,
    service_version: String,
    observers: Vec<Arc<dyn RunObserver>>,
    tags: HashSet<String>,
    pending: Vec<PendingTask>,
}

impl fmt::Debug for SchedulerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerBuilder")
            .field("tags", &self.tags)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl SchedulerBuilder {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            service_version: SERVICE_VERSION.to_string(),
            observers: Vec::new(),
            tags: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Service version stamped into every run context.
    #[must_use]
    pub fn with_service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Add an observer notified after every run of every task.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Register a task under `spec.name`.
    ///
    /// Disabled specs are skipped. A malformed cadence or a tag that is
    /// already registered is a configuration error the caller must treat
    /// as fatal.
    pub fn register_task(
        &mut self,
        spec: TaskSpec,
        handler: TaskHandler,
    ) -> Result<(), SchedulerError> {
        if !spec.enabled {
            tracing::info!(task = %spec.name, "Scheduler {} is disabled, skipping", spec.name);
            return Ok(());
        }

        let cadence = Cadence::from_spec(&spec)?;
        if !self.tags.insert(spec.name.clone()) {
            return Err(SchedulerError::DuplicateTag(spec.name));
        }

        tracing::info!(
            task = %spec.name,
            cadence = %cadence,
            "Assigning scheduler {}",
            spec.name
        );
        self.pending.push(PendingTask {
            spec,
            cadence,
            handler,
            registered_at: Instant::now(),
        });
        Ok(())
    }

    /// Freeze the registry.
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        let observers: Arc<[Arc<dyn RunObserver>]> = Arc::from(self.observers);
        let mut registry = JobRegistry::new();
        for pending in self.pending {
            let task = WrappedTask::new(
                &pending.spec.name,
                pending.handler,
                Arc::clone(&self.auth),
                Arc::clone(&observers),
            )
            .with_service_version(&self.service_version);
            registry.insert(Job::new(
                pending.spec,
                pending.cadence,
                task,
                pending.registered_at,
            ))?;
        }

        Ok(Scheduler {
            registry: Arc::new(registry),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }
}

/// The running scheduler.
///
/// Each job gets its own cadence loop; runs are spawned so a slow or failing
/// run never delays the loop that fired it.
#[derive(Debug)]
pub struct Scheduler {
    registry: Arc<JobRegistry>,
    started: AtomicBool,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Scheduler {
    #[must_use]
    pub fn builder(auth: Arc<dyn AuthService>) -> SchedulerBuilder {
        SchedulerBuilder::new(auth)
    }

    /// Start the cadence loops in the background and return immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self) -> Result<(), SchedulerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyStarted);
        }

        for job in self.registry.jobs() {
            let job = Arc::clone(job);
            let cancel = self.cancel.child_token();
            let tracker = self.tracker.clone();
            self.tracker.spawn(drive(job, cancel, tracker));
        }

        tracing::info!(jobs = self.registry.len(), "Scheduler is running");
        Ok(())
    }

    /// Run the job tagged `name` now and wait for it to finish.
    ///
    /// The run happens on its own task, so it completes even if the caller
    /// stops waiting. The job's next cadence fire is left untouched.
    pub async fn trigger_by_name(&self, name: &str) -> Result<RunOutcome, SchedulerError> {
        let job = self
            .registry
            .get(name)
            .ok_or_else(|| SchedulerError::TaskNotFound(name.to_string()))?;

        tracing::info!(task = %name, "Triggering scheduler {}", name);
        self.tracker
            .spawn(async move { job.run(RunOrigin::Trigger).await })
            .await
            .map_err(|err| SchedulerError::Interrupted {
                task: name.to_string(),
                reason: err.to_string(),
            })
    }

    /// Stop the cadence loops. Runs already in flight keep going.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        tracing::info!("Scheduler stopped");
    }

    /// Wait for the cadence loops and in-flight runs to finish after
    /// [`Self::shutdown`].
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// When the job tagged `name` will fire next.
    pub fn next_fire(&self, name: &str) -> Option<Instant> {
        self.registry.get(name).and_then(|job| job.next_fire())
    }
}

async fn drive(job: Arc<Job>, cancel: CancellationToken, tracker: TaskTracker) {
    let mut next = job.first_fire();
    loop {
        job.set_next_fire(next);
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep_until(next) => {}
        }

        let fired = Arc::clone(&job);
        tracker.spawn(async move {
            fired.run(RunOrigin::Cadence).await;
        });
        next = job.rearm(next);
    }
    tracing::debug!(task = %job.name(), "Cadence loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::auth::JwtAuth;
    use crate::scheduler::task_handler;
    use std::time::Duration;

    fn builder() -> SchedulerBuilder {
        Scheduler::builder(Arc::new(JwtAuth::disabled()))
    }

    fn noop() -> TaskHandler {
        task_handler(|_ctx| async { Ok(()) })
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let mut builder = builder();
        builder
            .register_task(TaskSpec::interval("HelloWorld", Duration::from_secs(1)), noop())
            .unwrap();
        let err = builder
            .register_task(TaskSpec::daily("HelloWorld", "10:00"), noop())
            .unwrap_err();
        assert_eq!(err, SchedulerError::DuplicateTag("HelloWorld".to_string()));
    }

    #[test]
    fn test_disabled_task_is_skipped() {
        let mut builder = builder();
        builder
            .register_task(
                TaskSpec::interval("Off", Duration::from_secs(1)).with_enabled(false),
                noop(),
            )
            .unwrap();
        // A disabled task does not claim its tag.
        builder
            .register_task(TaskSpec::interval("Off", Duration::from_secs(1)), noop())
            .unwrap();
        let scheduler = builder.build().unwrap();
        assert_eq!(scheduler.registry().names(), vec!["Off".to_string()]);
    }

    #[test]
    fn test_invalid_cadence_is_rejected() {
        let mut builder = builder();
        let err = builder
            .register_task(TaskSpec::daily("Report", "25:99"), noop())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCadence { .. }));
    }

    #[tokio::test]
    async fn test_trigger_unknown_is_not_found() {
        let scheduler = builder().build().unwrap();
        let err = scheduler.trigger_by_name("unknown").await.unwrap_err();
        assert_eq!(err, SchedulerError::TaskNotFound("unknown".to_string()));
        assert!(scheduler.registry().is_empty());
    }

    #[tokio::test]
    async fn test_run_twice_fails() {
        let scheduler = builder().build().unwrap();
        scheduler.run().unwrap();
        assert!(scheduler.is_running());
        assert_eq!(scheduler.run().unwrap_err(), SchedulerError::AlreadyStarted);
        scheduler.shutdown();
        assert!(!scheduler.is_running());
    }
}
