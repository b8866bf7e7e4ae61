//! Notifier port for lifecycle and failure events.
//!
//! Notifications are side-effect-only: delivery failures are logged by the
//! adapters and never surfaced to the update path.

use std::time::Duration;

use crate::domain::CycleReport;

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// The updater process started and is initializing.
    UpdaterStarted,
    /// A full update cycle is starting.
    CycleStarted {
        /// Servers in the sweep.
        servers: usize,
        /// Marketable items fetched per server.
        items: usize,
        /// Chunks per server.
        chunks: usize,
        /// Total upstream requests expected for the cycle.
        requests: usize,
        /// Rough expected wall-clock duration.
        expected: Duration,
    },
    /// A full update cycle finished.
    CycleCompleted(CycleReport),
    /// An upstream request or a server update failed.
    ///
    /// Bursts of these are collapsed by the webhook adapter.
    UpstreamError { source: String, message: String },
    /// No cycle has succeeded within the stall horizon. Restart is an
    /// external supervisor's responsibility; this only signals.
    StallDetected { horizon: Duration },
}

impl Event {
    /// True for error-class events subject to burst throttling.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Event::UpstreamError { .. })
    }
}

/// Trait for notification handlers.
///
/// Implementations must be thread-safe and must not block: slow delivery
/// belongs on a spawned task fed by a channel.
pub trait Notifier: Send + Sync {
    /// Handle an event. Must return quickly.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that emits events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{error, info, warn};
        match event {
            Event::UpdaterStarted => {
                info!("Updater started");
            }
            Event::CycleStarted {
                servers,
                items,
                chunks,
                requests,
                expected,
            } => {
                info!(
                    servers,
                    items,
                    chunks,
                    requests,
                    expected_secs = expected.as_secs(),
                    "Full update starting"
                );
            }
            Event::CycleCompleted(report) => {
                info!(
                    success = report.overall_success(),
                    servers = report.server_count(),
                    failed = report.failed_servers().len(),
                    total_secs = report.total_elapsed().as_secs(),
                    "Full update finished"
                );
            }
            Event::UpstreamError { source, message } => {
                warn!(source = %source, message = %message, "Upstream error reported");
            }
            Event::StallDetected { horizon } => {
                error!(
                    horizon_secs = horizon.as_secs(),
                    "No successful update cycle within the stall horizon"
                );
            }
        }
    }
}
