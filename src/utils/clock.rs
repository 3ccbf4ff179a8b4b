use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing time across the monitor. Wall-clock time is
/// used for accounting and midnight math, monotonic instants drive the event loop deadlines.
/// Swapping it out allows tests to control both.
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Current time in the user's local zone. Daily counters roll over at local midnight.
    fn local_time(&self) -> DateTime<FixedOffset> {
        self.time().with_timezone(&Local).fixed_offset()
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[cfg(test)]
pub mod test_clock {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tokio::time::Instant;

    use super::Clock;

    pub const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        match NaiveDate::from_ymd_opt(2018, 7, 4) {
            Some(v) => v,
            None => panic!("invalid test date"),
        },
        NaiveTime::MIN,
    );

    /// Clock that only moves when told to. Local time is UTC so midnight math is deterministic.
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::starting_at(Utc.from_utc_datetime(&TEST_START_DATE))
        }

        pub fn starting_at(start: DateTime<Utc>) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        pub fn advance(&self, by: chrono::Duration) {
            *self.now.lock().unwrap() += by;
        }

        pub fn advance_secs(&self, seconds: i64) {
            self.advance(chrono::Duration::seconds(seconds));
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn time(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }

        fn local_time(&self) -> DateTime<FixedOffset> {
            self.time().fixed_offset()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    /// Clock whose wall time follows tokio's (possibly paused) monotonic time.
    #[derive(Clone)]
    pub struct TestClock {
        pub start_time: DateTime<Utc>,
        pub reference: Instant,
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                start_time: Utc.from_utc_datetime(&TEST_START_DATE),
                reference: Instant::now(),
            }
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn local_time(&self) -> DateTime<FixedOffset> {
            self.time().fixed_offset()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }
}
