//! Update scheduling configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the update orchestrator's scheduling strategies.
///
/// The full sequential sweep and the rotating single-server refresh are
/// independent: either, both, or neither may be enabled. When both run they
/// share the rate governor as their only synchronization point.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Enable the strictly sequential full-cycle sweep.
    pub full_cycle_enabled: bool,
    /// Pause between the end of one full cycle and the start of the next.
    pub delay_between_runs_secs: u64,
    /// Enable the rotating single-server refresh.
    pub rotating_enabled: bool,
    /// Total period over which the rotation visits every server once; the
    /// tick interval is `total_period / server_count`.
    pub rotating_total_period_secs: u64,
    /// Emit a stall alert when no full cycle has succeeded for this long.
    pub stall_horizon_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            full_cycle_enabled: true,
            delay_between_runs_secs: 3600,
            rotating_enabled: false,
            rotating_total_period_secs: 86_400,
            stall_horizon_secs: 86_400,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn delay_between_runs(&self) -> Duration {
        Duration::from_secs(self.delay_between_runs_secs)
    }

    #[must_use]
    pub fn rotating_total_period(&self) -> Duration {
        Duration::from_secs(self.rotating_total_period_secs)
    }

    /// Rotation tick interval for a given server count.
    #[must_use]
    pub fn rotation_interval(&self, server_count: usize) -> Duration {
        self.rotating_total_period() / server_count.max(1) as u32
    }

    #[must_use]
    pub fn stall_horizon(&self) -> Duration {
        Duration::from_secs(self.stall_horizon_secs)
    }
}
