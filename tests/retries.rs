use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use retryvisor::{
    AbortReason, AttemptContext, DeploymentConfig, EventKind, Execution, JitterPolicy,
    MaxRetries, NonRecoverableError, RecoverableError, Report, RuntimeConfig, RuntimeError,
    TaskError, TaskFn, TaskId, TaskRef, TaskSpec, TaskStatus,
};
use tokio::time::Instant;

/// Terminal outcomes as seen by the workflow engine.
#[derive(Default)]
struct Recorder {
    outcomes: Mutex<Vec<(String, Result<(), AbortReason>)>>,
}

impl Recorder {
    fn outcomes(&self) -> Vec<(String, Result<(), AbortReason>)> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Report for Recorder {
    async fn on_task_succeeded(&self, task: &TaskId) {
        self.outcomes
            .lock()
            .unwrap()
            .push((task.to_string(), Ok(())));
    }

    async fn on_task_aborted(&self, task: &TaskId, reason: &AbortReason) {
        self.outcomes
            .lock()
            .unwrap()
            .push((task.to_string(), Err(reason.clone())));
    }
}

/// Invocation timestamps of one task.
#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<Instant>>>);

impl Calls {
    fn record(&self) -> usize {
        let mut calls = self.0.lock().unwrap();
        calls.push(Instant::now());
        calls.len()
    }

    fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    fn gaps(&self) -> Vec<Duration> {
        let calls = self.0.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Fails `failures` times with `err`, then succeeds.
fn fails_then_succeeds(
    name: &'static str,
    failures: usize,
    err: fn() -> TaskError,
    calls: Calls,
) -> TaskRef {
    TaskFn::arc(name, move |_ctx: AttemptContext| {
        let n = calls.record();
        let res = if n <= failures { Err(err()) } else { Ok(()) };
        async move { res }
    })
}

fn recoverable() -> TaskError {
    TaskError::recoverable("connection refused")
}

fn execution(cfg: RuntimeConfig, reporter: &Arc<Recorder>) -> Arc<Execution> {
    let reporter: Arc<dyn Report> = reporter.clone();
    Execution::builder(cfg).with_reporter(reporter).build()
}

#[tokio::test(start_paused = true)]
async fn limited_retries_then_success() {
    let recorder = Arc::new(Recorder::default());
    let deployment = DeploymentConfig {
        task_retries: Some(2),
        task_retry_interval: Some(3.0),
    };
    let exec = Execution::builder(RuntimeConfig::default())
        .with_deployment_config(&deployment)
        .unwrap()
        .with_reporter(recorder.clone())
        .build();

    let calls = Calls::default();
    let task = fails_then_succeeds("node_1.create", 2, recoverable, calls.clone());
    exec.submit(TaskSpec::new(task)).await.unwrap();

    let report = exec.wait().await.unwrap();
    let t = report.get("node_1.create").unwrap();
    assert_eq!(t.status, TaskStatus::Succeeded);
    assert_eq!(t.invocations, 3);
    assert_eq!(calls.count(), 3);
    for gap in calls.gaps() {
        assert!(gap >= Duration::from_secs(3), "gap {gap:?} shorter than interval");
    }
    assert_eq!(recorder.outcomes(), vec![("node_1.create".to_string(), Ok(()))]);
}

#[tokio::test(start_paused = true)]
async fn unlimited_retries_until_success() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let calls = Calls::default();
    let spec = TaskSpec::builder("db.wait_ready")
        .max_retries(MaxRetries::Unlimited)
        .retry_interval(Duration::from_secs(1))
        .build_from_task(fails_then_succeeds("db.wait_ready", 5, recoverable, calls.clone()));
    exec.submit(spec).await.unwrap();

    let report = exec.wait().await.unwrap();
    assert!(report.is_success());
    assert_eq!(calls.count(), 6);
    assert!(calls.gaps().iter().all(|g| *g >= Duration::from_secs(1)));
}

#[tokio::test(start_paused = true)]
async fn budget_exempt_task_ignores_zero_retries() {
    let recorder = Arc::new(Recorder::default());
    let exec = Execution::builder(RuntimeConfig::default())
        .with_deployment_config(&DeploymentConfig {
            task_retries: Some(0),
            task_retry_interval: Some(0.0),
        })
        .unwrap()
        .with_reporter(recorder.clone())
        .build();

    let calls = Calls::default();
    let spec = TaskSpec::builder("host.get_state")
        .budget_exempt(MaxRetries::Limited(3))
        .build_from_task(fails_then_succeeds("host.get_state", 3, recoverable, calls.clone()));
    let policy = exec.submit(spec).await.unwrap();
    assert_eq!(policy.max_retries, MaxRetries::Limited(0));

    let report = exec.wait().await.unwrap();
    assert_eq!(report.get("host.get_state").unwrap().status, TaskStatus::Succeeded);
    assert_eq!(calls.count(), 4);
}

#[tokio::test(start_paused = true)]
async fn non_recoverable_aborts_after_one_invocation() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let calls = Calls::default();
    let spec = TaskSpec::builder("node_1.install")
        .max_retries(MaxRetries::Limited(5))
        .build_from_task(fails_then_succeeds(
            "node_1.install",
            usize::MAX,
            || NonRecoverableError::new("unsupported OS").into(),
            calls.clone(),
        ));
    exec.submit(spec).await.unwrap();

    let report = exec.wait().await.unwrap();
    let t = report.get("node_1.install").unwrap();
    assert_eq!(t.status, TaskStatus::Aborted);
    assert_eq!(t.invocations, 1);
    assert_eq!(calls.count(), 1);

    let outcomes = recorder.outcomes();
    assert_eq!(outcomes.len(), 1);
    let reason = outcomes[0].1.clone().unwrap_err();
    assert_eq!(
        reason.to_string(),
        "failing task on non-recoverable error: unsupported OS"
    );
}

#[tokio::test(start_paused = true)]
async fn retry_after_overrides_policy_interval() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let calls = Calls::default();
    let spec = TaskSpec::builder("node_1.configure")
        .max_retries(MaxRetries::Limited(1))
        .retry_interval(Duration::from_secs(1000))
        .build_from_task(fails_then_succeeds(
            "node_1.configure",
            1,
            || {
                RecoverableError::new("operation retry")
                    .with_retry_after(Duration::from_secs(1))
                    .into()
            },
            calls.clone(),
        ));
    exec.submit(spec).await.unwrap();

    let report = exec.wait().await.unwrap();
    assert!(report.is_success());
    assert_eq!(calls.count(), 2);
    let gap = calls.gaps()[0];
    assert!(gap >= Duration::from_secs(1));
    assert!(gap < Duration::from_secs(1000), "policy interval was used: {gap:?}");
}

#[derive(Debug, thiserror::Error)]
#[error("user defined failure")]
struct UserDefined;

#[tokio::test(start_paused = true)]
async fn unclassified_errors_are_retried() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let calls = Calls::default();
    let spec = TaskSpec::builder("node_1.start")
        .max_retries(MaxRetries::Limited(1))
        .build_from_task(fails_then_succeeds(
            "node_1.start",
            1,
            || anyhow::Error::new(UserDefined).into(),
            calls.clone(),
        ));
    exec.submit(spec).await.unwrap();

    let report = exec.wait().await.unwrap();
    assert_eq!(report.get("node_1.start").unwrap().status, TaskStatus::Succeeded);
    assert_eq!(calls.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn always_failing_task_makes_n_plus_one_invocations() {
    for n in 0..4u32 {
        let recorder = Arc::new(Recorder::default());
        let exec = execution(RuntimeConfig::default(), &recorder);

        let calls = Calls::default();
        let spec = TaskSpec::builder("flaky")
            .max_retries(MaxRetries::Limited(n))
            .retry_interval(Duration::from_secs(2))
            .build_from_task(fails_then_succeeds(
                "flaky",
                usize::MAX,
                || TaskError::unclassified(UserDefined),
                calls.clone(),
            ));
        exec.submit(spec).await.unwrap();

        let report = exec.wait().await.unwrap();
        let t = report.get("flaky").unwrap();
        assert_eq!(t.status, TaskStatus::Aborted);
        assert_eq!(calls.count(), n as usize + 1);
        assert!(calls.gaps().iter().all(|g| *g >= Duration::from_secs(2)));

        let reason = t.abort.clone().unwrap();
        assert_eq!(reason.as_label(), "abort_budget_exhausted");
        assert!(
            reason
                .to_string()
                .starts_with(&format!("retry budget exhausted after {} attempt(s)", n + 1)),
            "{reason}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn undecodable_remote_outcome_is_recoverable() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let calls = Calls::default();
    let spec = TaskSpec::builder("remote.op")
        .max_retries(MaxRetries::Limited(1))
        .build_from_task(fails_then_succeeds(
            "remote.op",
            1,
            || TaskError::remote(b"\x00garbage".to_vec()),
            calls.clone(),
        ));
    exec.submit(spec).await.unwrap();

    let report = exec.wait().await.unwrap();
    assert!(report.is_success());
    assert_eq!(calls.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_drops_pending_retry_and_reports_nothing() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);
    let mut events = exec.subscribe();

    let calls = Calls::default();
    let spec = TaskSpec::builder("poll")
        .max_retries(MaxRetries::Unlimited)
        .retry_interval(Duration::from_secs(100))
        .build_from_task(fails_then_succeeds("poll", usize::MAX, recoverable, calls.clone()));
    exec.submit(spec).await.unwrap();

    while events.recv().await.unwrap().kind != EventKind::RetryScheduled {}
    exec.cancel();

    let report = exec.wait().await.unwrap();
    let t = report.get("poll").unwrap();
    assert_eq!(t.status, TaskStatus::Cancelled);
    assert_eq!(calls.count(), 1);
    assert!(recorder.outcomes().is_empty());

    let late = TaskSpec::new(fails_then_succeeds("late", 0, recoverable, Calls::default()));
    assert!(matches!(
        exec.submit(late).await,
        Err(RuntimeError::ExecutionClosed)
    ));
}

#[tokio::test(start_paused = true)]
async fn in_flight_attempt_still_reports_after_cancel() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let task: TaskRef = TaskFn::arc("slow", |_ctx: AttemptContext| async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<(), TaskError>(())
    });
    exec.submit(TaskSpec::new(task)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    exec.cancel();

    let report = exec.wait().await.unwrap();
    assert_eq!(report.get("slow").unwrap().status, TaskStatus::Succeeded);
    assert_eq!(recorder.outcomes(), vec![("slow".to_string(), Ok(()))]);
}

#[tokio::test(start_paused = true)]
async fn grace_exceeded_lists_stuck_tasks() {
    let recorder = Arc::new(Recorder::default());
    let cfg = RuntimeConfig {
        grace: Duration::from_secs(5),
        ..RuntimeConfig::default()
    };
    let exec = execution(cfg, &recorder);

    let task: TaskRef = TaskFn::arc("stuck", |_ctx: AttemptContext| async {
        tokio::time::sleep(Duration::from_secs(1000)).await;
        Ok::<(), TaskError>(())
    });
    exec.submit(TaskSpec::new(task)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    exec.cancel();

    match exec.wait().await {
        Err(RuntimeError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_secs(5));
            assert_eq!(stuck, vec!["stuck".to_string()]);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn cancel_task_stops_only_that_task() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);
    let mut events = exec.subscribe();

    let spec = TaskSpec::builder("poll")
        .max_retries(MaxRetries::Unlimited)
        .retry_interval(Duration::from_secs(50))
        .build_from_task(fails_then_succeeds("poll", usize::MAX, recoverable, Calls::default()));
    exec.submit(spec).await.unwrap();
    let other = TaskSpec::builder("other")
        .max_retries(MaxRetries::Limited(1))
        .retry_interval(Duration::from_secs(60))
        .build_from_task(fails_then_succeeds("other", 1, recoverable, Calls::default()));
    exec.submit(other).await.unwrap();

    loop {
        let ev = events.recv().await.unwrap();
        if ev.kind == EventKind::RetryScheduled && ev.task.as_deref() == Some("poll") {
            break;
        }
    }
    assert!(exec.cancel_task(&TaskId::from("poll")).await);
    assert!(!exec.cancel_task(&TaskId::from("missing")).await);

    let report = exec.wait().await.unwrap();
    assert_eq!(report.get("poll").unwrap().status, TaskStatus::Cancelled);
    assert_eq!(report.get("other").unwrap().status, TaskStatus::Succeeded);
    assert_eq!(recorder.outcomes(), vec![("other".to_string(), Ok(()))]);
}

fn always_failing_poll(name: &'static str, calls: Calls) -> TaskSpec {
    TaskSpec::builder(name)
        .max_retries(MaxRetries::Unlimited)
        .retry_interval(Duration::from_secs(100))
        .build_from_task(fails_then_succeeds(name, usize::MAX, recoverable, calls))
}

#[tokio::test(start_paused = true)]
async fn cancel_task_while_waiting() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);
    let mut events = exec.subscribe();

    let calls = Calls::default();
    exec.submit(always_failing_poll("poll", calls.clone()))
        .await
        .unwrap();
    let waiter = {
        let exec = Arc::clone(&exec);
        tokio::spawn(async move { exec.wait().await })
    };
    while events.recv().await.unwrap().kind != EventKind::RetryScheduled {}
    tokio::task::yield_now().await;

    assert!(exec.cancel_task(&TaskId::from("poll")).await);
    let report = tokio::time::timeout(Duration::from_secs(10), waiter)
        .await
        .expect("wait should finish once the task is cancelled")
        .unwrap()
        .unwrap();

    assert_eq!(report.get("poll").unwrap().status, TaskStatus::Cancelled);
    assert_eq!(calls.count(), 1);
    assert!(recorder.outcomes().is_empty());
    assert!(exec.task_ids().await.is_empty());
    assert!(!exec.cancel_task(&TaskId::from("poll")).await);
}

#[tokio::test(start_paused = true)]
async fn duplicate_submit_while_waiting_is_rejected() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);
    let mut events = exec.subscribe();

    let first = Calls::default();
    let second = Calls::default();
    exec.submit(always_failing_poll("dup", first.clone()))
        .await
        .unwrap();
    let waiter = {
        let exec = Arc::clone(&exec);
        tokio::spawn(async move { exec.wait().await })
    };
    while events.recv().await.unwrap().kind != EventKind::RetryScheduled {}
    tokio::task::yield_now().await;

    assert!(matches!(
        exec.submit(always_failing_poll("dup", second.clone())).await,
        Err(RuntimeError::DuplicateTask { .. })
    ));
    assert_eq!(exec.task_ids().await, vec!["dup".to_string()]);

    tokio::time::sleep(Duration::from_secs(250)).await;
    assert_eq!(second.count(), 0);
    assert_eq!(first.count(), 3);

    exec.cancel();
    let report = waiter.await.unwrap().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.get("dup").unwrap().status, TaskStatus::Cancelled);
    assert!(recorder.outcomes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_as_recoverable_failure() {
    let recorder = Arc::new(Recorder::default());
    let cfg = RuntimeConfig {
        timeout: Duration::from_secs(1),
        ..RuntimeConfig::default()
    };
    let exec = execution(cfg, &recorder);

    let calls = Calls::default();
    let c = calls.clone();
    let spec = TaskSpec::builder("hangs_once")
        .max_retries(MaxRetries::Limited(1))
        .build(move |_ctx: AttemptContext| {
            let first = c.record() == 1;
            async move {
                if first {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok::<(), TaskError>(())
            }
        });
    exec.submit(spec).await.unwrap();

    let report = exec.wait().await.unwrap();
    assert!(report.is_success());
    assert_eq!(calls.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrency_cap_limits_in_flight_attempts() {
    let recorder = Arc::new(Recorder::default());
    let cfg = RuntimeConfig {
        max_concurrent: 1,
        ..RuntimeConfig::default()
    };
    let exec = execution(cfg, &recorder);

    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    for name in ["a", "b", "c"] {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        let task: TaskRef = TaskFn::arc(name, move |_ctx: AttemptContext| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), TaskError>(())
            }
        });
        exec.submit(TaskSpec::new(task)).await.unwrap();
    }

    let report = exec.wait().await.unwrap();
    assert_eq!(report.len(), 3);
    assert!(report.is_success());
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn jitter_never_fires_early() {
    let recorder = Arc::new(Recorder::default());
    let cfg = RuntimeConfig {
        jitter: JitterPolicy::Full,
        ..RuntimeConfig::default()
    };
    let exec = execution(cfg, &recorder);

    let calls = Calls::default();
    let spec = TaskSpec::builder("jittered")
        .max_retries(MaxRetries::Limited(5))
        .retry_interval(Duration::from_secs(2))
        .build_from_task(fails_then_succeeds("jittered", 5, recoverable, calls.clone()));
    exec.submit(spec).await.unwrap();

    exec.wait().await.unwrap();
    for gap in calls.gaps() {
        assert!(gap >= Duration::from_secs(2), "{gap:?}");
        assert!(gap <= Duration::from_secs(4) + Duration::from_millis(1), "{gap:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn duplicate_task_ids_are_rejected() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);

    let spec = || {
        TaskSpec::builder("dup")
            .max_retries(MaxRetries::Unlimited)
            .retry_interval(Duration::from_secs(10))
            .build_from_task(fails_then_succeeds("dup", 1, recoverable, Calls::default()))
    };
    exec.submit(spec()).await.unwrap();
    assert!(matches!(
        exec.submit(spec()).await,
        Err(RuntimeError::DuplicateTask { .. })
    ));
    exec.wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn events_follow_the_retry_lifecycle() {
    let recorder = Arc::new(Recorder::default());
    let exec = execution(RuntimeConfig::default(), &recorder);
    let mut events = exec.subscribe();

    let spec = TaskSpec::builder("lifecycle")
        .max_retries(MaxRetries::Limited(1))
        .build_from_task(fails_then_succeeds("lifecycle", 1, recoverable, Calls::default()));
    exec.submit(spec).await.unwrap();
    exec.wait().await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert_eq!(
        kinds,
        vec![
            EventKind::TaskSubmitted,
            EventKind::AttemptStarting,
            EventKind::AttemptFailed,
            EventKind::RetryScheduled,
            EventKind::AttemptStarting,
            EventKind::AttemptSucceeded,
            EventKind::TaskSucceeded,
        ]
    );
}
