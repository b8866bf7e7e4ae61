//! Per-cycle outcome reporting.

use std::time::Duration;

use super::server::Server;

/// Outcome of one server-update attempt within a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub server: Server,
    pub success: bool,
    pub elapsed: Duration,
}

impl RunOutcome {
    #[must_use]
    pub fn success(server: Server, elapsed: Duration) -> Self {
        Self {
            server,
            success: true,
            elapsed,
        }
    }

    #[must_use]
    pub fn failure(server: Server, elapsed: Duration) -> Self {
        Self {
            server,
            success: false,
            elapsed,
        }
    }
}

/// Aggregated report for one full update cycle.
///
/// Built from the per-server outcomes once the sweep finishes, handed to the
/// reporter, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    outcomes: Vec<RunOutcome>,
}

impl CycleReport {
    #[must_use]
    pub fn new(outcomes: Vec<RunOutcome>) -> Self {
        Self { outcomes }
    }

    /// True when every server in the cycle updated successfully.
    #[must_use]
    pub fn overall_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.success)
    }

    /// Servers whose update failed, in sweep order.
    #[must_use]
    pub fn failed_servers(&self) -> Vec<&Server> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.success)
            .map(|outcome| &outcome.server)
            .collect()
    }

    /// Sum of per-server elapsed times.
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.outcomes.iter().map(|outcome| outcome.elapsed).sum()
    }

    /// Mean elapsed time per server, zero for an empty cycle.
    #[must_use]
    pub fn average_per_server(&self) -> Duration {
        if self.outcomes.is_empty() {
            return Duration::ZERO;
        }
        self.total_elapsed() / self.outcomes.len() as u32
    }

    #[must_use]
    pub fn server_count(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn outcomes(&self) -> &[RunOutcome] {
        &self.outcomes
    }
}
