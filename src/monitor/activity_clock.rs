use chrono::{DateTime, Duration, Utc};

/// Tracks when the user was last seen and derives idleness from it.
///
/// Besides the current flag it remembers whether idleness was observed at any point since the
/// last accumulation tick, so a tick spanning an idle gap never counts that gap.
pub struct ActivityClock {
    threshold: Duration,
    last_activity_at: DateTime<Utc>,
    idle: bool,
    idle_since_tick: bool,
}

impl ActivityClock {
    pub fn new(threshold: Duration, moment: DateTime<Utc>) -> Self {
        Self {
            threshold,
            last_activity_at: moment,
            idle: false,
            idle_since_tick: false,
        }
    }

    fn exceeds_threshold(&self, moment: DateTime<Utc>) -> bool {
        moment - self.last_activity_at > self.threshold
    }

    /// Registers user activity. A gap longer than the threshold marks the current tick as idle.
    pub fn record(&mut self, moment: DateTime<Utc>) {
        if self.exceeds_threshold(moment) {
            self.idle_since_tick = true;
        }
        self.last_activity_at = moment;
        self.idle = false;
    }

    /// Periodic idle check. Returns the new idle flag.
    pub fn evaluate(&mut self, moment: DateTime<Utc>) -> bool {
        self.idle = self.exceeds_threshold(moment);
        if self.idle {
            self.idle_since_tick = true;
        }
        self.idle
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Consumes the idle observation for the tick ending at `moment`.
    pub fn take_tick_idle(&mut self, moment: DateTime<Utc>) -> bool {
        let idle = self.evaluate(moment) || self.idle_since_tick;
        self.idle_since_tick = false;
        idle
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::utils::clock::test_clock::TEST_START_DATE;

    use super::ActivityClock;

    #[test]
    fn test_idle_after_threshold() {
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        let mut clock = ActivityClock::new(Duration::seconds(60), start);

        assert!(!clock.evaluate(start + Duration::seconds(60)));
        assert!(clock.evaluate(start + Duration::seconds(61)));
        assert!(clock.is_idle());

        clock.record(start + Duration::seconds(70));
        assert!(!clock.is_idle());
    }

    #[test]
    fn test_gap_marks_tick_idle() {
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        let mut clock = ActivityClock::new(Duration::seconds(60), start);

        clock.record(start + Duration::seconds(90));

        assert!(!clock.is_idle());
        assert!(clock.take_tick_idle(start + Duration::seconds(100)));
        assert!(!clock.take_tick_idle(start + Duration::seconds(110)));
    }
}
