//! Rate governor tuning knobs.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the outbound dispatch rate governor.
///
/// The upstream market API enforces an undocumented soft request limit, so
/// admission reacts to a live rate estimate (trailing window average plus a
/// last-second burst counter) while a separate concurrency ceiling bounds
/// resource use regardless of rate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Target requests per second. The consumer loop ticks at
    /// `1000ms / target_rps`.
    pub target_rps: u32,
    /// Dispatches allowed in the current wall-clock second before admission
    /// is penalized.
    pub burst_ceiling: u32,
    /// Admission is penalized once the trailing-window average exceeds
    /// `target_rps - safety_margin_rps`.
    pub safety_margin_rps: u32,
    /// Extra delay applied to a dispatch when the rate estimate is hot.
    pub penalty_delay_ms: u64,
    /// Hard ceiling on simultaneously in-flight dispatches.
    pub concurrency: usize,
    /// Maximum attempts per job before its future resolves as permanently
    /// failed.
    pub retry_budget: u32,
    /// Backoff base: retry `n` waits `n^2 * backoff_base_ms` before
    /// re-entering the queue.
    pub backoff_base_ms: u64,
    /// A dispatch outstanding longer than this is force-requeued (once).
    pub timeout_ceiling_secs: u64,
    /// Trailing horizon of the rate accounting window.
    pub window_secs: u64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            target_rps: 15,
            burst_ceiling: 20,
            safety_margin_rps: 2,
            penalty_delay_ms: 750,
            concurrency: 10,
            retry_budget: 10,
            backoff_base_ms: 1500,
            timeout_ceiling_secs: 30,
            window_secs: 10,
        }
    }
}

impl GovernorConfig {
    /// Interval between admission ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.target_rps.max(1)))
    }

    /// Penalty delay applied when the rate estimate is above target.
    #[must_use]
    pub fn penalty_delay(&self) -> Duration {
        Duration::from_millis(self.penalty_delay_ms)
    }

    /// Backoff before retry attempt `attempt` (1-based) re-enters the queue.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(u64::from(attempt).pow(2) * self.backoff_base_ms)
    }

    /// Ceiling after which an in-flight dispatch is abandoned and requeued.
    #[must_use]
    pub fn timeout_ceiling(&self) -> Duration {
        Duration::from_secs(self.timeout_ceiling_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_matches_target_rps() {
        let config = GovernorConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(1000 / 15));
    }

    #[test]
    fn backoff_grows_quadratically() {
        let config = GovernorConfig {
            backoff_base_ms: 100,
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(400));
        assert_eq!(config.backoff_for(3), Duration::from_millis(900));
    }
}
