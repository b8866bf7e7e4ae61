//! Recurring resync orchestration across the server list.
//!
//! Two independently toggleable strategies drive updates: a strictly
//! sequential full-cycle sweep and a rotating single-server refresh. Both
//! funnel every upstream call through the shared rate governor, which is
//! their only synchronization point; one server's failure never aborts a
//! cycle or blocks the servers after it.

mod stall;

pub use stall::StallWatchdog;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::domain::{CycleReport, ItemCatalog, ItemId, RunOutcome, Server};
use crate::error::Result;
use crate::port::notifier::{Event, NotifierRegistry};
use crate::port::{keys, CacheUpdater, MarketFetcher, SnapshotStore};

/// Rough per-server wall-clock estimate used for cycle-start announcements.
const PER_SERVER_ESTIMATE: Duration = Duration::from_secs(180);

/// Collaborators a server update runs against.
pub struct UpdateContext {
    pub fetcher: Arc<dyn MarketFetcher>,
    pub store: Arc<dyn SnapshotStore>,
    pub cache: Arc<dyn CacheUpdater>,
    pub notifiers: Arc<NotifierRegistry>,
    pub catalog: Arc<ItemCatalog>,
}

/// Drives recurring resync cycles over the server list.
pub struct UpdateOrchestrator {
    context: UpdateContext,
    servers: Vec<Server>,
    items: Vec<ItemId>,
    config: SchedulerConfig,
    /// Chunk size mirrored here only for cycle-start announcements.
    chunk_size: usize,
    watchdog: StallWatchdog,
}

impl UpdateOrchestrator {
    /// Create the orchestrator and spawn its stall watchdog.
    #[must_use]
    pub fn new(
        context: UpdateContext,
        servers: Vec<Server>,
        items: Vec<ItemId>,
        config: SchedulerConfig,
        chunk_size: usize,
    ) -> Self {
        let watchdog =
            StallWatchdog::spawn(config.stall_horizon(), Arc::clone(&context.notifiers));
        Self {
            context,
            servers,
            items,
            config,
            chunk_size: chunk_size.max(1),
            watchdog,
        }
    }

    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Run the enabled scheduling strategies until shutdown.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        let mut handles = Vec::new();

        if self.config.full_cycle_enabled {
            let this = Arc::clone(&self);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                this.full_cycle_loop(shutdown).await;
            }));
        }

        if self.config.rotating_enabled {
            let this = Arc::clone(&self);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                this.rotating_loop(shutdown).await;
            }));
        }

        if handles.is_empty() {
            warn!("No scheduling strategy enabled, orchestrator is idle");
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Sequential sweep strategy: cycle, wait, repeat.
    async fn full_cycle_loop(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.run_full_cycle().await;

            tokio::select! {
                () = tokio::time::sleep(self.config.delay_between_runs()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Full-cycle loop stopped");
    }

    /// One full sequential sweep over every server.
    ///
    /// Server N+1 starts only after server N's fetch and cache update finish;
    /// failed servers are recorded and skipped over, never retried within the
    /// same cycle.
    pub async fn run_full_cycle(&self) -> CycleReport {
        let chunks = self.items.len().div_ceil(self.chunk_size);
        self.context.notifiers.notify_all(Event::CycleStarted {
            servers: self.servers.len(),
            items: self.items.len(),
            chunks,
            requests: chunks * self.servers.len(),
            expected: PER_SERVER_ESTIMATE * self.servers.len() as u32,
        });

        let mut outcomes = Vec::with_capacity(self.servers.len());
        for server in &self.servers {
            outcomes.push(self.update_server(server).await);
        }

        let report = CycleReport::new(outcomes);
        if report.overall_success() {
            self.watchdog.record_success();
        }
        self.context
            .notifiers
            .notify_all(Event::CycleCompleted(report.clone()));
        report
    }

    /// Rotating strategy: each tick refreshes exactly one server, round-robin.
    ///
    /// Refreshes run on spawned tasks so a slow slot never holds up the
    /// ticker or the other slots. A tick whose slot has not finished its
    /// previous refresh is dropped, not queued; the round-robin index still
    /// advances past it.
    async fn rotating_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        if self.servers.is_empty() {
            return;
        }
        let period = self.config.rotation_interval(self.servers.len());
        info!(
            period_secs = period.as_secs(),
            servers = self.servers.len(),
            "Rotating refresh started"
        );

        let busy: Vec<Arc<AtomicBool>> = self
            .servers
            .iter()
            .map(|_| Arc::new(AtomicBool::new(false)))
            .collect();

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // An interval's first tick fires immediately; the rotation begins one
        // full period after startup instead.
        ticker.tick().await;

        let mut index: usize = 0;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let slot = index % self.servers.len();
                    index = index.wrapping_add(1);

                    if busy[slot].swap(true, Ordering::SeqCst) {
                        debug!(server = %self.servers[slot], "Rotation slot still busy, dropping tick");
                        continue;
                    }

                    let this = Arc::clone(&self);
                    let flag = Arc::clone(&busy[slot]);
                    tokio::spawn(async move {
                        let server = this.servers[slot].clone();
                        let outcome = this.update_server(&server).await;
                        debug!(server = %server, success = outcome.success, "Rotation refresh settled");
                        flag.store(false, Ordering::SeqCst);
                    });
                }
            }
        }
        info!("Rotating loop stopped");
    }

    /// Update one server end to end: fetch, persist snapshots, recompute the
    /// profit cache, stamp the update time.
    pub async fn update_server(&self, server: &Server) -> RunOutcome {
        let started = Instant::now();
        info!(server = %server, "Starting market data aggregation");

        match self.try_update(server).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                info!(server = %server, elapsed_secs = elapsed.as_secs(), "Server update ok");
                RunOutcome::success(server.clone(), elapsed)
            }
            Err(err) => {
                let elapsed = started.elapsed();
                warn!(server = %server, error = %err, "Server update failed");
                self.context.notifiers.notify_all(Event::UpstreamError {
                    source: format!("[Updater] Server {server}"),
                    message: err.to_string(),
                });
                RunOutcome::failure(server.clone(), elapsed)
            }
        }
    }

    async fn try_update(&self, server: &Server) -> Result<()> {
        let listings = self.context.fetcher.fetch(server, &self.items).await?;

        // Independent key per (server, item); last-write-wins is all the
        // downstream cache needs.
        for (item, payload) in &listings {
            self.context
                .store
                .set(&keys::snapshot(server, *item), payload.to_string())
                .await?;
        }

        self.context
            .cache
            .update(
                std::slice::from_ref(server),
                &self.context.catalog,
                self.context.store.as_ref(),
            )
            .await?;

        self.context
            .store
            .set(
                &keys::profit_updated(server),
                Utc::now().timestamp_millis().to_string(),
            )
            .await?;
        Ok(())
    }
}
