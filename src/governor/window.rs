//! Trailing per-second rate accounting.

use std::collections::VecDeque;

/// Per-second dispatch counters over a trailing horizon.
///
/// One counter bucket per second; buckets older than the horizon are evicted
/// on every accounting pass, so the deque never grows past `horizon_secs`
/// entries. The moving average always divides by the full averaging span:
/// until the window has warmed this under-reports the true rate, which the
/// admission loop accepts as brief cold-start excess.
#[derive(Debug)]
pub struct RateWindow {
    horizon_secs: u64,
    /// Seconds the 10s moving average divides by.
    average_span_secs: u64,
    /// `(second, count)` buckets in ascending second order.
    counters: VecDeque<(u64, u32)>,
}

impl RateWindow {
    #[must_use]
    pub fn new(horizon_secs: u64) -> Self {
        Self {
            horizon_secs,
            average_span_secs: 10,
            counters: VecDeque::new(),
        }
    }

    /// Count one admitted dispatch in the bucket for `now_secs`.
    pub fn record(&mut self, now_secs: u64) {
        self.evict(now_secs);
        match self.counters.back_mut() {
            Some((second, count)) if *second == now_secs => *count += 1,
            _ => self.counters.push_back((now_secs, 1)),
        }
    }

    /// Dispatches admitted during the current second.
    #[must_use]
    pub fn burst(&self, now_secs: u64) -> u32 {
        self.counters
            .iter()
            .rev()
            .find(|(second, _)| *second == now_secs)
            .map_or(0, |(_, count)| *count)
    }

    /// Moving average over the last ten seconds, in dispatches per second.
    #[must_use]
    pub fn average(&self, now_secs: u64) -> f64 {
        let cutoff = now_secs.saturating_sub(self.average_span_secs - 1);
        let sum: u32 = self
            .counters
            .iter()
            .filter(|(second, _)| *second >= cutoff)
            .map(|(_, count)| *count)
            .sum();
        f64::from(sum) / self.average_span_secs as f64
    }

    /// Drop buckets older than the horizon.
    pub fn evict(&mut self, now_secs: u64) {
        let cutoff = now_secs.saturating_sub(self.horizon_secs.saturating_sub(1));
        while matches!(self.counters.front(), Some((second, _)) if *second < cutoff) {
            self.counters.pop_front();
        }
    }

    /// Number of retained buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
