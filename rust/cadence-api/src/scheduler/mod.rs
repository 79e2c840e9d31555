//! In-process task scheduler.
//!
//! Tasks are registered once at startup through a [`SchedulerBuilder`],
//! each under a unique tag, with either a daily time-of-day or a fixed
//! interval [`Cadence`]. After [`Scheduler::run`] every job is driven by its
//! own background loop; [`Scheduler::trigger_by_name`] runs a job
//! out-of-band without touching its schedule.
//!
//! All runs go through the execution wrapper in [`wrapper`], which isolates
//! task failures from the scheduler and reports outcomes to any registered
//! [`RunObserver`].

pub mod cadence;
pub mod engine;
pub mod registry;
pub mod wrapper;

pub use cadence::{Cadence, CadenceKind};
pub use engine::{Scheduler, SchedulerBuilder};
pub use registry::{Job, JobRegistry};
pub use wrapper::{
    RunObserver, RunOrigin, RunOutcome, TaskFuture, TaskHandler, WrappedTask, task_handler,
};

use std::time::Duration;

/// Static description of one scheduled task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Unique task name, also used as the scheduler tag.
    pub name: String,
    /// Disabled tasks are skipped at registration.
    pub enabled: bool,
    /// Which cadence fields apply.
    pub kind: CadenceKind,
    /// Period between fires, for [`CadenceKind::Interval`].
    pub interval: Duration,
    /// `HH:MM` (UTC), for [`CadenceKind::Daily`].
    pub time_of_day: String,
}

impl TaskSpec {
    /// An enabled task firing every `interval`.
    #[must_use]
    pub fn interval(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            kind: CadenceKind::Interval,
            interval,
            time_of_day: String::new(),
        }
    }

    /// An enabled task firing once a day at `time_of_day` UTC.
    #[must_use]
    pub fn daily(name: impl Into<String>, time_of_day: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            kind: CadenceKind::Daily,
            interval: Duration::ZERO,
            time_of_day: time_of_day.into(),
        }
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Scheduler failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A second task was registered under an existing tag.
    #[error("Assigning Scheduler {0} error: duplicate scheduler tag")]
    DuplicateTag(String),

    /// The task's cadence fields do not describe a usable schedule.
    #[error("Assigning Scheduler {task} error: {reason}")]
    InvalidCadence { task: String, reason: String },

    /// No task is registered under the requested tag.
    #[error("scheduler {0} not found")]
    TaskNotFound(String),

    /// [`Scheduler::run`] was called more than once.
    #[error("scheduler is already running")]
    AlreadyStarted,

    /// A triggered run was torn down before it could report an outcome.
    #[error("scheduler {task} run was interrupted: {reason}")]
    Interrupted { task: String, reason: String },
}

impl SchedulerError {
    pub(crate) fn invalid_cadence(task: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCadence {
            task: task.to_string(),
            reason: reason.into(),
        }
    }
}
