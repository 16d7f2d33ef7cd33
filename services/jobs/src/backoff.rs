use rand::Rng;
use std::time::Duration;

/// Delay policy between two status polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_delay: Duration,
    /// Jitter in percent of the computed delay, applied in both directions
    pub jitter_pct: u32,
}

impl PollSchedule {
    pub fn new(interval: Duration, max_delay: Duration) -> Self {
        Self {
            interval,
            max_delay: max_delay.max(interval),
            jitter_pct: 20,
        }
    }

    /// Delay before the next poll after `consecutive_failures` transport errors in a row.
    ///
    /// Healthy polling runs on the plain interval. Failures double the delay
    /// each time, capped at `max_delay`, with jitter so clients that lost
    /// the backend together do not come back in lockstep.
    pub fn next_delay(&self, consecutive_failures: u32, rng: &mut impl Rng) -> Duration {
        if consecutive_failures == 0 {
            return self.interval;
        }

        // exponent = failures - 1, so the first failure waits one interval
        let exp = consecutive_failures.saturating_sub(1).min(31);
        let pow2 = 1_u32.checked_shl(exp).unwrap_or(u32::MAX);
        let delay = self.interval.saturating_mul(pow2).min(self.max_delay);

        let delay_ms = delay.as_millis() as f64;
        let jitter_range = delay_ms * f64::from(self.jitter_pct) / 100.0;
        let jitter = rng.gen_range(-jitter_range..=jitter_range);

        let floor = self.interval.as_millis() as f64;
        let ceiling = self.max_delay.as_millis() as f64;
        let jittered = (delay_ms + jitter).round().clamp(floor, ceiling);
        Duration::from_millis(jittered as u64)
    }
}
