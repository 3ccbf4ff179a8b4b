use chrono::{DateTime, Days, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

/// Returns start of the next day in the zone of `date`. Falls back to a plain 24 hour step if
/// the zone has no valid midnight (e.g. a DST gap at 00:00).
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    let tomorrow = date
        .date_naive()
        .checked_add_days(Days::new(1))
        .map(|day| day.and_time(NaiveTime::MIN));

    tomorrow
        .and_then(|naive| date.timezone().from_local_datetime(&naive).earliest())
        .unwrap_or_else(|| date + Duration::days(1))
}

/// True if `moment` falls on a local day before the one `local_now` is on.
pub fn is_before_today(moment: DateTime<Utc>, local_now: DateTime<FixedOffset>) -> bool {
    next_day_start(moment.with_timezone(local_now.offset())) <= local_now
}

/// Converts a chrono duration into a std one, clamping negatives to zero.
pub fn to_std_duration(duration: Duration) -> std::time::Duration {
    duration.to_std().unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{is_before_today, next_day_start};

    #[test]
    fn test_next_day_start_positive_offset() {
        let zone = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();

        let next = next_day_start(now);

        assert_eq!(
            next.date_naive(),
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
        assert_eq!(next - now, Duration::minutes(30));
    }

    #[test]
    fn test_next_day_start_at_midnight_is_full_day() {
        let zone = FixedOffset::east_opt(0).unwrap();
        let now = zone.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

        assert_eq!(next_day_start(now) - now, Duration::days(1));
    }

    #[test]
    fn test_next_day_start_month_boundary() {
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();

        assert_eq!(
            next_day_start(now).date_naive(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_is_before_today_uses_local_day() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:00 UTC is already the next day locally.
        let local_now = Utc
            .with_ymd_and_hms(2024, 3, 10, 23, 0, 0)
            .unwrap()
            .with_timezone(&zone);

        let late_yesterday = Utc.with_ymd_and_hms(2024, 3, 10, 21, 30, 0).unwrap();
        let early_today = Utc.with_ymd_and_hms(2024, 3, 10, 22, 30, 0).unwrap();

        assert!(is_before_today(late_yesterday, local_now));
        assert!(!is_before_today(early_today, local_now));
        assert!(!is_before_today(local_now.with_timezone(&Utc), local_now));
    }
}
