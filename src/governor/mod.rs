//! Rate-governed dispatch of outbound upstream calls.
//!
//! The [`RateGovernor`] is the single point of rate and concurrency control
//! for every outbound market API call. Callers submit a target URL and get a
//! future back; internally a FIFO queue feeds a consumer loop that paces
//! admissions against a live rate estimate, a bounded worker pool executes
//! admitted dispatches, and transient failures are retried with quadratic
//! backoff until the retry budget runs out.
//!
//! The upstream API enforces an undocumented soft request limit: pacing by
//! fixed interval alone still trips it, so admission also consults the
//! trailing [`RateWindow`] and penalizes dispatch when the last second burst
//! or the ten-second moving average runs hot.

mod window;

pub use window::RateWindow;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::GovernorConfig;
use crate::error::{Error, Result, UpstreamError};
use crate::port::notifier::{Event, NotifierRegistry};

/// Executes one admitted dispatch against the upstream.
///
/// The production implementation is a reqwest GET returning parsed JSON;
/// tests script responses without any network.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn dispatch(&self, target: &str) -> std::result::Result<Self::Output, UpstreamError>;
}

#[async_trait]
impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    type Output = D::Output;

    async fn dispatch(&self, target: &str) -> std::result::Result<Self::Output, UpstreamError> {
        (**self).dispatch(target).await
    }
}

/// A queued dispatch job.
///
/// Lives from submission until its reply channel resolves. The job value
/// moves between the queue and the worker, so a logical job is never queued
/// and in flight at the same time.
struct Job<T> {
    target: String,
    enqueued_at: Instant,
    /// Completed (failed) attempts so far.
    attempt: u32,
    /// Whether the once-only timeout requeue has been used.
    timed_out: bool,
    reply: oneshot::Sender<Result<T>>,
}

/// Shared consumer-loop state.
struct Shared<D: Dispatch> {
    config: GovernorConfig,
    dispatcher: D,
    window: Mutex<RateWindow>,
    /// Bounds simultaneously in-flight dispatches to `config.concurrency`.
    pool: Arc<Semaphore>,
    in_flight: AtomicUsize,
    started_at: Instant,
    notifiers: Arc<NotifierRegistry>,
}

impl<D: Dispatch> Shared<D> {
    /// Seconds since governor start, used as the rate-accounting clock.
    fn clock_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Global admission queue for outbound upstream calls.
///
/// One instance per process; constructing it spawns the single consumer
/// loop. [`RateGovernor::shutdown`] stops new admissions without aborting
/// in-flight work.
pub struct RateGovernor<D: Dispatch> {
    queue_tx: mpsc::UnboundedSender<Job<D::Output>>,
    shared: Arc<Shared<D>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<D: Dispatch> RateGovernor<D> {
    /// Create a governor and spawn its consumer loop.
    #[must_use]
    pub fn new(config: GovernorConfig, dispatcher: D, notifiers: Arc<NotifierRegistry>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            window: Mutex::new(RateWindow::new(config.window_secs)),
            pool: Arc::new(Semaphore::new(config.concurrency)),
            in_flight: AtomicUsize::new(0),
            started_at: Instant::now(),
            notifiers,
            config,
            dispatcher,
        });

        tokio::spawn(consumer_loop(
            Arc::clone(&shared),
            queue_rx,
            queue_tx.clone(),
            shutdown_rx,
        ));

        Self {
            queue_tx,
            shared,
            shutdown_tx,
        }
    }

    /// Submit a dispatch target and wait for its result.
    ///
    /// The job joins the back of the FIFO queue; there is no priority
    /// ordering. The returned future resolves when the dispatch completes or
    /// fails permanently.
    ///
    /// # Errors
    ///
    /// [`Error::PermanentDispatch`] once the retry budget is exhausted, or
    /// [`Error::GovernorClosed`] if the consumer stopped before completion.
    pub async fn submit(&self, target: impl Into<String>) -> Result<D::Output> {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            target: target.into(),
            enqueued_at: Instant::now(),
            attempt: 0,
            timed_out: false,
            reply,
        };
        self.queue_tx.send(job).map_err(|_| Error::GovernorClosed)?;
        rx.await.map_err(|_| Error::GovernorClosed)?
    }

    /// Dispatches currently executing against the upstream.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Stop admitting new dispatches. In-flight work runs to completion;
    /// queued and future submissions resolve with [`Error::GovernorClosed`].
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// The single consumer loop: one admission decision per tick.
async fn consumer_loop<D: Dispatch>(
    shared: Arc<Shared<D>>,
    mut queue_rx: mpsc::UnboundedReceiver<Job<D::Output>>,
    requeue_tx: mpsc::UnboundedSender<Job<D::Output>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(shared.config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        target_rps = shared.config.target_rps,
        concurrency = shared.config.concurrency,
        "Rate governor consumer started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Ok(job) = queue_rx.try_recv() else {
                    continue;
                };
                admit(&shared, job, &requeue_tx).await;
            }
        }
    }

    info!("Rate governor consumer stopped, in-flight work will drain");
}

/// Decide dispatch delay for the popped head job, then hand it to a worker.
async fn admit<D: Dispatch>(
    shared: &Arc<Shared<D>>,
    job: Job<D::Output>,
    requeue_tx: &mpsc::UnboundedSender<Job<D::Output>>,
) {
    let config = &shared.config;
    let now = shared.clock_secs();
    let (burst, average) = {
        let mut window = shared.window.lock();
        window.evict(now);
        (window.burst(now), window.average(now))
    };

    let rate_cap = f64::from(config.target_rps - config.safety_margin_rps);
    if burst > config.burst_ceiling || average > rate_cap {
        debug!(burst, average, "Rate estimate hot, delaying dispatch");
        tokio::time::sleep(config.penalty_delay()).await;
    }

    // Worker pool ceiling; admission stalls while all permits are out.
    let Ok(permit) = Arc::clone(&shared.pool).acquire_owned().await else {
        return;
    };

    shared.window.lock().record(shared.clock_secs());
    shared.in_flight.fetch_add(1, Ordering::SeqCst);

    let shared = Arc::clone(shared);
    let requeue_tx = requeue_tx.clone();
    tokio::spawn(async move {
        // On expiry the dispatch future is dropped: the abandoned attempt's
        // connection is torn down and can never race its requeued successor.
        let outcome = tokio::time::timeout(
            shared.config.timeout_ceiling(),
            shared.dispatcher.dispatch(&job.target),
        )
        .await;

        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        drop(permit);

        settle(&shared, job, outcome, &requeue_tx).await;
    });
}

/// Resolve, requeue, or permanently fail a settled dispatch.
async fn settle<D: Dispatch>(
    shared: &Shared<D>,
    mut job: Job<D::Output>,
    outcome: std::result::Result<
        std::result::Result<D::Output, UpstreamError>,
        tokio::time::error::Elapsed,
    >,
    requeue_tx: &mpsc::UnboundedSender<Job<D::Output>>,
) {
    let error = match outcome {
        Ok(Ok(output)) => {
            let _ = job.reply.send(Ok(output));
            return;
        }
        Ok(Err(error)) => error,
        Err(_) if !job.timed_out => {
            // Once-only fallback: stop waiting and send the job back through
            // the queue without consuming retry budget.
            job.timed_out = true;
            warn!(
                url = %job.target,
                waited_secs = job.enqueued_at.elapsed().as_secs(),
                "Dispatch exceeded the timeout ceiling, requeueing once"
            );
            let _ = requeue_tx.send(job);
            return;
        }
        Err(_) => UpstreamError::Timeout(shared.config.timeout_ceiling()),
    };

    shared.notifiers.notify_all(Event::UpstreamError {
        source: job.target.clone(),
        message: error.to_string(),
    });

    job.attempt += 1;
    if job.attempt >= shared.config.retry_budget {
        warn!(
            url = %job.target,
            attempts = job.attempt,
            error = %error,
            "Retry budget exhausted, failing dispatch permanently"
        );
        let _ = job.reply.send(Err(Error::PermanentDispatch {
            target: job.target,
            attempts: job.attempt,
            source: error,
        }));
        return;
    }

    let delay = shared.config.backoff_for(job.attempt);
    debug!(
        url = %job.target,
        attempt = job.attempt,
        delay_ms = delay.as_millis() as u64,
        error = %error,
        "Transient dispatch failure, backing off before requeue"
    );
    tokio::time::sleep(delay).await;
    let _ = requeue_tx.send(job);
}
