use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// The first instant of the given calendar day, as UTC.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// The last counted second of the given calendar day (23:59:59), as UTC.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    date.and_time(end).and_utc()
}

/// The most recent Monday 00:00 in the given UTC offset, at or before `now`,
/// converted back to UTC for storage queries.
#[must_use]
pub fn start_of_week(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = now.with_timezone(&offset);
    let back = i64::from(local.weekday().num_days_from_monday());
    let monday = local.date_naive() - Duration::days(back);
    local_midnight(monday, offset)
}

/// The seven calendar days ending on `now`'s day in the given offset,
/// ordered oldest to newest. Always exactly seven entries.
#[must_use]
pub fn chart_days(now: DateTime<Utc>, offset: FixedOffset) -> [NaiveDate; 7] {
    let today = now.with_timezone(&offset).date_naive();
    std::array::from_fn(|i| today - Duration::days(6 - i as i64))
}

/// The UTC instant where the 7-day chart window opens: local midnight six
/// days before `now`'s day.
#[must_use]
pub fn chart_window_start(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let first = now.with_timezone(&offset).date_naive() - Duration::days(6);
    local_midnight(first, offset)
}

/// The calendar day an instant falls on in the given offset.
#[must_use]
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    // Fixed offsets have no gaps or overlaps, so the mapping is unique.
    match offset.from_local_datetime(&date.and_time(NaiveTime::MIN)) {
        chrono::LocalResult::Single(t) => t.with_timezone(&Utc),
        _ => start_of_day(date) - Duration::seconds(i64::from(offset.local_minus_utc())),
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn sao_paulo() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        let before = clock.now();
        clock.advance(Duration::minutes(15));
        assert_eq!(clock.now(), before + Duration::minutes(15));
    }

    #[test]
    fn day_bounds() {
        let day = NaiveDate::from_ymd_opt(2023, 11, 14).unwrap();
        assert_eq!(start_of_day(day).to_rfc3339(), "2023-11-14T00:00:00+00:00");
        assert_eq!(end_of_day(day).to_rfc3339(), "2023-11-14T23:59:59+00:00");
    }

    #[test]
    fn week_starts_on_most_recent_monday() {
        // fixed_now is Tuesday 2023-11-14 22:13:20 UTC = 19:13:20 in UTC-3
        let start = start_of_week(fixed_now(), sao_paulo());
        let local = start.with_timezone(&sao_paulo());
        assert_eq!(local.weekday(), Weekday::Mon);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2023, 11, 13).unwrap());
        assert_eq!(local.time(), NaiveTime::MIN);
    }

    #[test]
    fn week_start_on_a_monday_is_that_day() {
        // Monday 2023-11-13 12:00 UTC-3
        let monday_noon = sao_paulo()
            .with_ymd_and_hms(2023, 11, 13, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let start = start_of_week(monday_noon, sao_paulo());
        assert_eq!(
            start.with_timezone(&sao_paulo()).date_naive(),
            NaiveDate::from_ymd_opt(2023, 11, 13).unwrap()
        );
    }

    #[test]
    fn week_start_on_a_sunday_reaches_back_six_days() {
        let sunday = sao_paulo()
            .with_ymd_and_hms(2023, 11, 19, 8, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let start = start_of_week(sunday, sao_paulo());
        assert_eq!(
            start.with_timezone(&sao_paulo()).date_naive(),
            NaiveDate::from_ymd_opt(2023, 11, 13).unwrap()
        );
    }

    #[test]
    fn chart_days_are_seven_and_ordered() {
        let days = chart_days(fixed_now(), sao_paulo());
        assert_eq!(days.len(), 7);
        assert_eq!(days[6], NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2023, 11, 8).unwrap());
        for pair in days.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn offset_shifts_the_local_day() {
        // 2023-11-15 01:00 UTC is still 2023-11-14 in UTC-3
        let at = Utc.with_ymd_and_hms(2023, 11, 15, 1, 0, 0).unwrap();
        assert_eq!(
            local_day(at, sao_paulo()),
            NaiveDate::from_ymd_opt(2023, 11, 14).unwrap()
        );
        assert_eq!(
            local_day(at, FixedOffset::east_opt(0).unwrap()),
            NaiveDate::from_ymd_opt(2023, 11, 15).unwrap()
        );
    }
}
