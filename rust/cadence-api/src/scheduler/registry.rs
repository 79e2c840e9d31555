//! Job registry: tag → scheduled job.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{Cadence, RunOrigin, RunOutcome, SchedulerError, TaskSpec, WrappedTask};

/// A registered job: its spec, cadence, wrapped callback and next-run bookkeeping.
#[derive(Debug)]
pub struct Job {
    spec: TaskSpec,
    cadence: Cadence,
    task: WrappedTask,
    registered_at: Instant,
    next_fire: Mutex<Option<Instant>>,
    /// Wall-clock slot the pending daily fire belongs to.
    daily_slot: Mutex<Option<DateTime<Utc>>>,
}

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

impl Job {
    pub(crate) fn new(
        spec: TaskSpec,
        cadence: Cadence,
        task: WrappedTask,
        registered_at: Instant,
    ) -> Self {
        Self {
            spec,
            cadence,
            task,
            registered_at,
            next_fire: Mutex::new(None),
            daily_slot: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// When the cadence loop will fire next, once the scheduler is running.
    pub fn next_fire(&self) -> Option<Instant> {
        *self.next_fire.lock()
    }

    pub(crate) fn set_next_fire(&self, at: Instant) {
        *self.next_fire.lock() = Some(at);
    }

    /// First fire: interval jobs count from registration, daily jobs from
    /// the wall clock.
    pub(crate) fn first_fire(&self) -> Instant {
        match self.cadence {
            Cadence::Interval(every) => self.registered_at + every,
            Cadence::Daily(_) => {
                let now = Utc::now();
                let slot = self.cadence.next_after(now);
                *self.daily_slot.lock() = Some(slot);
                Instant::now() + self.cadence.delay_after(now)
            }
        }
    }

    /// Next fire after the one scheduled for `fired_at`.
    ///
    /// A loop that fell behind skips the missed slots instead of firing them
    /// back to back. Daily jobs advance from the slot that just fired, never
    /// from the wall clock alone, so consecutive fires are at least a day apart
    /// even if the clock stepped back.
    pub(crate) fn rearm(&self, fired_at: Instant) -> Instant {
        let now = Instant::now();
        match self.cadence {
            Cadence::Interval(every) => {
                let next = fired_at + every;
                if next <= now { now + every } else { next }
            }
            Cadence::Daily(_) => {
                let mut slot = self.daily_slot.lock();
                let fired_slot = (*slot).unwrap_or_else(Utc::now);
                let next_slot = self
                    .cadence
                    .next_after(fired_slot)
                    .max(self.cadence.next_after(Utc::now()));
                *slot = Some(next_slot);

                let gap = (next_slot - fired_slot).to_std().unwrap_or(ONE_DAY).max(ONE_DAY);
                let next = fired_at + gap;
                if next <= now { now + ONE_DAY } else { next }
            }
        }
    }

    pub(crate) async fn run(&self, origin: RunOrigin) -> RunOutcome {
        self.task.call(origin).await
    }
}

/// Registered jobs keyed by tag. Read-only once the scheduler is built.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Arc<Job>>,
}

impl JobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job, rejecting a tag that is already taken.
    pub fn insert(&mut self, job: Job) -> Result<(), SchedulerError> {
        if self.jobs.contains_key(job.name()) {
            return Err(SchedulerError::DuplicateTag(job.name().to_string()));
        }
        self.jobs.insert(job.name().to_string(), Arc::new(job));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Job>> {
        self.jobs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Registered tags, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Arc<Job>> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::auth::JwtAuth;
    use crate::scheduler::task_handler;
    use std::time::Duration;

    fn job(name: &str, every: Duration) -> Job {
        job_for(TaskSpec::interval(name, every))
    }

    fn job_for(spec: TaskSpec) -> Job {
        let name = spec.name.clone();
        let cadence = Cadence::from_spec(&spec).unwrap();
        let task = WrappedTask::new(
            &name,
            task_handler(|_ctx| async { Ok(()) }),
            Arc::new(JwtAuth::disabled()),
            Arc::from(Vec::new()),
        );
        Job::new(spec, cadence, task, Instant::now())
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = JobRegistry::new();
        registry.insert(job("B", Duration::from_secs(1))).unwrap();
        registry.insert(job("A", Duration::from_secs(1))).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("A"));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut registry = JobRegistry::new();
        registry.insert(job("A", Duration::from_secs(1))).unwrap();
        let err = registry.insert(job("A", Duration::from_secs(2))).unwrap_err();
        assert_eq!(err, SchedulerError::DuplicateTag("A".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_first_fire_counts_from_registration() {
        let job = job("A", Duration::from_secs(30));
        let registered = job.registered_at;
        assert_eq!(job.first_fire(), registered + Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_rearm_skips_missed_slots() {
        let job = job("A", Duration::from_secs(10));
        let fired_at = Instant::now();
        assert_eq!(job.rearm(fired_at), fired_at + Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(25)).await;
        let now = Instant::now();
        assert_eq!(job.rearm(fired_at), now + Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_rearm_is_a_day_after_the_fired_slot() {
        let job = job_for(TaskSpec::daily("Nightly", "03:15"));
        let first = job.first_fire();
        let first_slot = (*job.daily_slot.lock()).unwrap();
        assert!(first - Instant::now() <= ONE_DAY);

        // Paused time leaves the wall clock short of the slot that fired
        tokio::time::advance(first - Instant::now()).await;
        let second = job.rearm(first);
        assert_eq!(second - first, ONE_DAY);
        assert_eq!((*job.daily_slot.lock()).unwrap(), first_slot + chrono::TimeDelta::days(1));

        let third = job.rearm(second);
        assert_eq!(third - second, ONE_DAY);
    }
}
