use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::debug;

use crate::utils::time::next_day_start;

/// Keeps the next local midnight. The deadline is recomputed from wall-clock time every time
/// it is rescheduled, never stepped by a fixed period, so DST changes and drift don't
/// accumulate.
pub struct DailyResetScheduler {
    next_reset: DateTime<Utc>,
}

impl DailyResetScheduler {
    pub fn new(local_now: DateTime<FixedOffset>) -> Self {
        let mut scheduler = Self {
            next_reset: local_now.with_timezone(&Utc),
        };
        scheduler.reschedule(local_now);
        scheduler
    }

    /// True if midnight has passed, including the case where the process slept through it.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_reset
    }

    /// Delay for the one-shot timer.
    pub fn until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_reset - now).max(Duration::zero())
    }

    pub fn reschedule(&mut self, local_now: DateTime<FixedOffset>) {
        self.next_reset = next_day_start(local_now).with_timezone(&Utc);
        debug!("Next daily reset at {}", self.next_reset);
    }

    pub fn next_reset(&self) -> DateTime<Utc> {
        self.next_reset
    }
}
