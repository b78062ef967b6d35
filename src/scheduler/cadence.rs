//! A fixed daily trigger time in a given timezone, independent of `Utc::now`
//! so it can be tested with arbitrary instants.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};

#[derive(Debug, Clone)]
pub(crate) struct DailyCadence {
    tz: FixedOffset,
    target: NaiveTime,
}

impl DailyCadence {
    pub(crate) fn new(tz: FixedOffset, hour: u32, minute: u32) -> Self {
        let target = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_else(|| panic!("invalid time: {hour:02}:{minute:02}"));
        Self { tz, target }
    }

    pub(crate) fn next_run_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let localized_now = now.with_timezone(&self.tz);
        let mut date = localized_now.date_naive();
        if localized_now.time() > self.target {
            date = advance_day(date);
        }

        let local_target = date.and_time(self.target);

        match self.tz.from_local_datetime(&local_target) {
            LocalResult::Single(dt) => dt.with_timezone(&Utc),
            LocalResult::Ambiguous(first, _) => first.with_timezone(&Utc),
            LocalResult::None => unreachable!("fixed offset should not produce nonexistent times"),
        }
    }
}

fn advance_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().expect("date should remain representable when advancing")
}

#[cfg(test)]
mod tests {
    use super::DailyCadence;
    use chrono::{DateTime, FixedOffset, Utc};

    fn parse_utc(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).expect("valid datetime").with_timezone(&Utc)
    }

    fn utc_offset() -> FixedOffset {
        FixedOffset::east_opt(0).expect("utc offset")
    }

    #[test]
    fn next_run_same_day_when_before_trigger() {
        let cadence = DailyCadence::new(utc_offset(), 4, 0);
        let now = parse_utc("2025-01-10T01:00:00Z");
        let expected = parse_utc("2025-01-10T04:00:00Z");
        assert_eq!(cadence.next_run_from(now), expected);
    }

    #[test]
    fn next_run_next_day_when_past_trigger() {
        let cadence = DailyCadence::new(utc_offset(), 4, 0);
        let now = parse_utc("2025-01-10T10:00:00Z");
        let expected = parse_utc("2025-01-11T04:00:00Z");
        assert_eq!(cadence.next_run_from(now), expected);
    }

    #[test]
    fn next_run_immediate_when_exact_trigger() {
        let cadence = DailyCadence::new(utc_offset(), 4, 0);
        let now = parse_utc("2025-01-10T04:00:00Z");
        assert_eq!(cadence.next_run_from(now), now);
    }
}
