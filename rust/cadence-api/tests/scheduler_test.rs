//! Scheduler behavior observed through the run observer hook.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use cadence_api::gateway::JwtAuth;
use cadence_api::scheduler::{
    RunObserver, RunOrigin, RunOutcome, Scheduler, SchedulerBuilder, SchedulerError, TaskSpec,
    task_handler,
};

type Fires = Arc<Mutex<Vec<(String, Instant, RunOrigin, bool)>>>;

fn recording_builder() -> (SchedulerBuilder, Fires) {
    let fires: Fires = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fires);
    let observer: Arc<dyn RunObserver> = Arc::new(move |outcome: &RunOutcome| {
        sink.lock().push((
            outcome.task.clone(),
            Instant::now(),
            outcome.origin,
            outcome.is_success(),
        ));
    });
    let builder = Scheduler::builder(Arc::new(JwtAuth::disabled())).with_observer(observer);
    (builder, fires)
}

fn fires_of(fires: &Fires, task: &str) -> Vec<(Instant, RunOrigin, bool)> {
    fires
        .lock()
        .iter()
        .filter(|(name, ..)| name == task)
        .map(|(_, at, origin, ok)| (*at, *origin, *ok))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_interval_fires_no_earlier_than_period_and_rearms() {
    let (mut builder, fires) = recording_builder();
    let registered = Instant::now();
    builder
        .register_task(
            TaskSpec::interval("Tick", Duration::from_secs(10)),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();
    let scheduler = builder.build().unwrap();
    scheduler.run().unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;

    let ticks = fires_of(&fires, "Tick");
    assert_eq!(ticks.len(), 3);
    assert!(ticks[0].0 >= registered + Duration::from_secs(10));
    for pair in ticks.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= Duration::from_secs(10));
    }
    assert!(ticks.iter().all(|(_, origin, ok)| *origin == RunOrigin::Cadence && *ok));

    scheduler.shutdown();
    scheduler.wait().await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_tasks_do_not_stop_other_tags() {
    let (mut builder, fires) = recording_builder();
    builder
        .register_task(
            TaskSpec::interval("Broken", Duration::from_secs(1)),
            task_handler(|_ctx| async { Err(anyhow::anyhow!("upstream unavailable")) }),
        )
        .unwrap();
    builder
        .register_task(
            TaskSpec::interval("Panicky", Duration::from_secs(1)),
            task_handler(|_ctx| async {
                let broken = true;
                if broken {
                    panic!("task bug");
                }
                Ok(())
            }),
        )
        .unwrap();
    builder
        .register_task(
            TaskSpec::interval("Steady", Duration::from_secs(1)),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();
    let scheduler = builder.build().unwrap();
    scheduler.run().unwrap();

    tokio::time::sleep(Duration::from_millis(5500)).await;

    let broken = fires_of(&fires, "Broken");
    let panicky = fires_of(&fires, "Panicky");
    let steady = fires_of(&fires, "Steady");
    assert_eq!(broken.len(), 5);
    assert_eq!(panicky.len(), 5);
    assert_eq!(steady.len(), 5);
    assert!(broken.iter().all(|(_, _, ok)| !ok));
    assert!(panicky.iter().all(|(_, _, ok)| !ok));
    assert!(steady.iter().all(|(_, _, ok)| *ok));
    assert!(scheduler.is_running());

    scheduler.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_trigger_runs_now_without_moving_next_fire() {
    let (mut builder, fires) = recording_builder();
    builder
        .register_task(
            TaskSpec::interval("Report", Duration::from_secs(60)),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();
    let scheduler = builder.build().unwrap();
    scheduler.run().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let before = scheduler.next_fire("Report").unwrap();
    let outcome = scheduler.trigger_by_name("Report").await.unwrap();
    let after = scheduler.next_fire("Report").unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.origin, RunOrigin::Trigger);
    assert_eq!(before, after);
    assert_eq!(fires_of(&fires, "Report").len(), 1);

    scheduler.shutdown();
}

#[tokio::test]
async fn test_trigger_unknown_has_no_side_effects() {
    let (mut builder, fires) = recording_builder();
    builder
        .register_task(
            TaskSpec::interval("Known", Duration::from_secs(60)),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();
    let scheduler = builder.build().unwrap();

    let err = scheduler.trigger_by_name("Unknown").await.unwrap_err();
    assert_eq!(err, SchedulerError::TaskNotFound("Unknown".to_string()));
    assert_eq!(scheduler.registry().names(), vec!["Known".to_string()]);
    assert!(fires.lock().is_empty());
}

#[test]
fn test_duplicate_tag_fails_before_serving() {
    let (mut builder, _) = recording_builder();
    builder
        .register_task(
            TaskSpec::interval("Twice", Duration::from_secs(1)),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();

    let err = builder
        .register_task(
            TaskSpec::daily("Twice", "09:00"),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateTag("Twice".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_daily_task_is_armed_within_a_day() {
    let (mut builder, fires) = recording_builder();
    builder
        .register_task(
            TaskSpec::daily("Nightly", "03:15"),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();
    let scheduler = builder.build().unwrap();
    scheduler.run().unwrap();
    tokio::task::yield_now().await;

    let next = scheduler.next_fire("Nightly").unwrap();
    let wait = next - Instant::now();
    assert!(wait > Duration::ZERO);
    assert!(wait <= Duration::from_secs(24 * 60 * 60));

    // Exactly one fire per 24h window
    tokio::time::sleep(wait + Duration::from_secs(60)).await;
    assert_eq!(fires_of(&fires, "Nightly").len(), 1);

    scheduler.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_daily_task_fires_once_per_day() {
    let (mut builder, fires) = recording_builder();
    builder
        .register_task(
            TaskSpec::daily("Nightly", "03:15"),
            task_handler(|_ctx| async { Ok(()) }),
        )
        .unwrap();
    let scheduler = builder.build().unwrap();
    scheduler.run().unwrap();
    tokio::task::yield_now().await;

    let first = scheduler.next_fire("Nightly").unwrap();
    tokio::time::sleep_until(first + Duration::from_secs(60 * 60)).await;
    assert_eq!(fires_of(&fires, "Nightly").len(), 1);

    tokio::time::sleep_until(first + Duration::from_secs(49 * 60 * 60)).await;
    let nightly = fires_of(&fires, "Nightly");
    assert_eq!(nightly.len(), 3);
    for pair in nightly.windows(2) {
        assert!(pair[1].0 - pair[0].0 >= Duration::from_secs(24 * 60 * 60));
    }

    scheduler.shutdown();
}

#[tokio::test]
async fn test_run_twice_is_rejected() {
    let (builder, _) = recording_builder();
    let scheduler = builder.build().unwrap();
    scheduler.run().unwrap();
    assert_eq!(scheduler.run().unwrap_err(), SchedulerError::AlreadyStarted);
    scheduler.shutdown();
    scheduler.wait().await;
    assert!(!scheduler.is_running());
}
