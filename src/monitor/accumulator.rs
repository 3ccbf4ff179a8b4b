use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Advances screen time on the accumulation cadence. Time that elapsed while the user was idle
/// is dropped, never queued for a later tick.
pub struct ScreenTimeAccumulator {
    previous_tick: DateTime<Utc>,
}

impl ScreenTimeAccumulator {
    pub fn new(moment: DateTime<Utc>) -> Self {
        Self {
            previous_tick: moment,
        }
    }

    /// Moves the tick mark to `moment` and returns the wall time to credit, if any.
    pub fn tick(&mut self, moment: DateTime<Utc>, idle: bool) -> Option<Duration> {
        let elapsed = moment - self.previous_tick;
        self.previous_tick = moment;

        if idle {
            debug!("Discarding {}ms of idle time", elapsed.num_milliseconds());
            return None;
        }
        // Clock went backwards. Nothing sensible to credit.
        if elapsed <= Duration::zero() {
            return None;
        }
        Some(elapsed)
    }

    /// Restarts accounting from `moment` without crediting anything.
    pub fn restart(&mut self, moment: DateTime<Utc>) {
        self.previous_tick = moment;
    }

    #[cfg(test)]
    pub fn previous_tick(&self) -> DateTime<Utc> {
        self.previous_tick
    }
}
