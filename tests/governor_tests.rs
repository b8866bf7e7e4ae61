//! Rate governor behavior under scripted dispatchers and simulated time.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use profiteer::config::GovernorConfig;
use profiteer::error::Error;
use profiteer::governor::RateGovernor;
use profiteer::port::NotifierRegistry;

use support::{
    AlwaysFailDispatch, CountingDispatch, ScriptedDispatch, SlowDispatch, TimestampingDispatch,
};

fn fast_config() -> GovernorConfig {
    GovernorConfig {
        target_rps: 100,
        burst_ceiling: 1000,
        safety_margin_rps: 1,
        penalty_delay_ms: 10,
        concurrency: 3,
        retry_budget: 4,
        backoff_base_ms: 5,
        timeout_ceiling_secs: 30,
        window_secs: 11,
    }
}

fn registry() -> Arc<NotifierRegistry> {
    Arc::new(NotifierRegistry::new())
}

#[tokio::test(start_paused = true)]
async fn in_flight_never_exceeds_worker_pool() {
    let dispatcher = Arc::new(CountingDispatch::new(Duration::from_secs(1)));
    let governor = RateGovernor::new(
        fast_config(),
        Arc::clone(&dispatcher),
        registry(),
    );

    let results = futures_util::future::join_all(
        (0..10).map(|i| governor.submit(format!("https://market.test/{i}"))),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 10);
    assert!(dispatcher.max_concurrent.load(Ordering::SeqCst) <= 3);
}

#[tokio::test(start_paused = true)]
async fn retry_budget_bounds_attempts_exactly() {
    let dispatcher = Arc::new(AlwaysFailDispatch::default());
    let governor = RateGovernor::new(fast_config(), Arc::clone(&dispatcher), registry());

    let err = governor
        .submit("https://market.test/flaky")
        .await
        .expect_err("budget must run out");

    match err {
        Error::PermanentDispatch {
            target, attempts, ..
        } => {
            assert_eq!(target, "https://market.test/flaky");
            assert_eq!(attempts, 4);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn jobs_dispatch_in_submission_order() {
    let dispatcher = Arc::new(ScriptedDispatch::default());
    let governor = RateGovernor::new(fast_config(), Arc::clone(&dispatcher), registry());

    let (a, b, c) = tokio::join!(
        governor.submit("https://market.test/alpha/1"),
        governor.submit("https://market.test/alpha/2"),
        governor.submit("https://market.test/alpha/3"),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let order = dispatcher.order.lock().clone();
    assert_eq!(
        order,
        vec![
            "https://market.test/alpha/1",
            "https://market.test/alpha/2",
            "https://market.test/alpha/3",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn warmed_window_never_exceeds_burst_ceiling_in_any_second() {
    // Production-shaped tuning: pacing at 15 rps under a ceiling of 20.
    let config = GovernorConfig {
        target_rps: 15,
        burst_ceiling: 20,
        safety_margin_rps: 2,
        penalty_delay_ms: 750,
        concurrency: 10,
        retry_budget: 3,
        backoff_base_ms: 5,
        timeout_ceiling_secs: 30,
        window_secs: 10,
    };
    let dispatcher = Arc::new(TimestampingDispatch::default());
    let governor = RateGovernor::new(config, Arc::clone(&dispatcher), registry());

    let results = futures_util::future::join_all(
        (0..60).map(|i| governor.submit(format!("https://market.test/{i}"))),
    )
    .await;
    assert!(results.iter().all(Result::is_ok));

    let times = dispatcher.times.lock().clone();
    assert_eq!(times.len(), 60);
    for (i, start) in times.iter().enumerate() {
        let in_window = times[i..]
            .iter()
            .take_while(|t| t.duration_since(*start) < Duration::from_secs(1))
            .count();
        assert!(
            in_window <= 20,
            "{in_window} dispatches inside one trailing second"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn timed_out_dispatch_is_requeued_once_for_free() {
    let config = GovernorConfig {
        timeout_ceiling_secs: 5,
        retry_budget: 2,
        ..fast_config()
    };
    // First call hangs past the ceiling, second answers immediately.
    let dispatcher = Arc::new(SlowDispatch::new(Duration::from_secs(60), 1));
    let governor = RateGovernor::new(config, Arc::clone(&dispatcher), registry());

    let result = governor.submit("https://market.test/slow").await;

    assert!(result.is_ok());
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn repeated_timeouts_consume_the_retry_budget() {
    let config = GovernorConfig {
        timeout_ceiling_secs: 5,
        retry_budget: 2,
        ..fast_config()
    };
    let dispatcher = Arc::new(SlowDispatch::new(Duration::from_secs(60), usize::MAX));
    let governor = RateGovernor::new(config, Arc::clone(&dispatcher), registry());

    let err = governor
        .submit("https://market.test/hung")
        .await
        .expect_err("every attempt hangs");

    match err {
        Error::PermanentDispatch { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected error: {other}"),
    }
    // One free requeue after the first timeout, then two budgeted attempts.
    assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_fails_new_submissions_with_closed() {
    let governor = RateGovernor::new(
        fast_config(),
        CountingDispatch::new(Duration::ZERO),
        registry(),
    );

    governor.shutdown();
    // Give the consumer loop a turn to observe the signal and drop the queue.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = governor
        .submit("https://market.test/late")
        .await
        .expect_err("governor is closed");
    assert!(matches!(err, Error::GovernorClosed));
}
