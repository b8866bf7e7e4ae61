//! Stall detection for the update pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::error;

use crate::port::notifier::{Event, NotifierRegistry};

/// Watches for prolonged absence of successful update cycles.
///
/// Every successful cycle rearms a rolling horizon; if the horizon elapses
/// without one, a single stall event is emitted and the timer rearms for the
/// next horizon. The watchdog only signals; restarting the process is an
/// external supervisor's responsibility.
pub struct StallWatchdog {
    reset_tx: watch::Sender<()>,
}

impl StallWatchdog {
    /// Spawn the watchdog task.
    #[must_use]
    pub fn spawn(horizon: Duration, notifiers: Arc<NotifierRegistry>) -> Self {
        let (reset_tx, mut reset_rx) = watch::channel(());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = reset_rx.changed() => {
                        if changed.is_err() {
                            // Watchdog handle dropped, nothing left to guard.
                            break;
                        }
                    }
                    () = tokio::time::sleep(horizon) => {
                        error!(
                            horizon_secs = horizon.as_secs(),
                            "No successful update cycle within the stall horizon"
                        );
                        notifiers.notify_all(Event::StallDetected { horizon });
                    }
                }
            }
        });

        Self { reset_tx }
    }

    /// Record a successful cycle, restarting the horizon.
    pub fn record_success(&self) {
        let _ = self.reset_tx.send(());
    }
}
