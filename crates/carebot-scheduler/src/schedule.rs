use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, DurationRound, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;

use crate::error::{Result, SchedulerError};

/// Longest daylight-saving gap searched for a valid instant.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// A recurrence rule: a cron expression (with a leading seconds field)
/// evaluated on the wall clock of a fixed timezone.
///
/// Wall-clock times that a DST change skips fire at the first valid instant
/// after the gap; times that repeat fire once, at the earlier instant.
#[derive(Debug, Clone)]
pub struct Trigger {
    expression: String,
    timezone: Tz,
    schedule: CronSchedule,
}

impl Trigger {
    /// Parse `expression`. Whether the rule still has an upcoming occurrence
    /// is checked at registration, against the scheduler's clock.
    pub fn parse(expression: &str, timezone: Tz) -> Result<Self> {
        let schedule =
            CronSchedule::from_str(expression).map_err(|e| SchedulerError::InvalidSchedule {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            timezone,
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First occurrence at or after `from`, at whole-second precision.
    ///
    /// Used at registration: a job whose occurrence falls on the current
    /// second is due immediately.
    pub fn first_at_or_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let second = from
            .duration_trunc(Duration::seconds(1))
            .unwrap_or(from);
        self.next_after(second - Duration::seconds(1))
    }

    /// First occurrence strictly after `from`.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Walk the rule on the naive wall clock; cron itself would drop
        // local times that are missing or repeated in the zone.
        let wall = Utc.from_utc_datetime(&from.with_timezone(&self.timezone).naive_local());
        self.schedule
            .after(&wall)
            .filter_map(|candidate| self.resolve(candidate.naive_utc()))
            .find(|instant| *instant > from)
    }

    /// Map a wall-clock time in the zone to the instant it fires at.
    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(t) => Some(t.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => self.end_of_gap(local),
        }
    }

    /// First valid instant after the DST gap containing `local`.
    fn end_of_gap(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let minute = local.with_second(0)?.with_nanosecond(0)?;
        (1..=MAX_GAP_MINUTES)
            .map(|m| minute + Duration::minutes(m))
            .find_map(|t| self.timezone.from_local_datetime(&t).earliest())
            .map(|t| t.with_timezone(&Utc))
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.expression, self.timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    fn london(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        chrono_tz::Europe::London
            .with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn monday_nine() -> Trigger {
        Trigger::parse("0 0 9 * * Mon", chrono_tz::Europe::London).unwrap()
    }

    #[test]
    fn invalid_expression_is_rejected() {
        let err = Trigger::parse("every monday", chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule { .. }));
    }

    #[test]
    fn exhausted_expression_has_no_next_occurrence() {
        // Only fires in 2001.
        let trigger = Trigger::parse("0 0 9 1 1 * 2001", chrono_tz::UTC).unwrap();
        assert_eq!(trigger.next_after(london(2026, 1, 1, 0, 0, 0)), None);
    }

    #[test]
    fn occurrence_on_the_current_second_is_inclusive() {
        // 2026-01-05 is a Monday.
        let at = london(2026, 1, 5, 9, 0, 0);
        assert_eq!(monday_nine().first_at_or_after(at), Some(at));
    }

    #[test]
    fn late_sunday_waits_for_monday() {
        let sunday = london(2026, 1, 4, 23, 59, 59);
        let next = monday_nine().first_at_or_after(sunday).unwrap();
        assert_eq!(next, london(2026, 1, 5, 9, 0, 0));
        assert_eq!(
            next.with_timezone(&chrono_tz::Europe::London).weekday(),
            Weekday::Mon
        );
    }

    #[test]
    fn next_after_is_strictly_later() {
        let trigger = monday_nine();
        let mut t = london(2026, 1, 5, 9, 0, 0);
        for _ in 0..10 {
            let next = trigger.next_after(t).unwrap();
            assert!(next > t);
            assert_eq!(next - t, Duration::days(7));
            t = next;
        }
    }

    #[test]
    fn evaluated_in_local_time_across_dst() {
        // Daily 09:00 London: 08:00 UTC in summer, 09:00 UTC in winter.
        let trigger = Trigger::parse("0 0 9 * * *", chrono_tz::Europe::London).unwrap();
        let summer = trigger.next_after(london(2026, 7, 1, 0, 0, 0)).unwrap();
        let winter = trigger.next_after(london(2026, 12, 1, 0, 0, 0)).unwrap();
        assert_eq!(summer.hour(), 8);
        assert_eq!(winter.hour(), 9);
    }

    #[test]
    fn repeated_hour_fires_once_at_the_earlier_instant() {
        // 25 Oct 2026: London clocks go back at 02:00 BST, 01:30 happens twice.
        let trigger = Trigger::parse("0 30 1 * * *", chrono_tz::Europe::London).unwrap();
        let first = trigger.next_after(utc(2026, 10, 24, 12, 0, 0)).unwrap();
        assert_eq!(first, utc(2026, 10, 25, 0, 30, 0));

        // The second 01:30 (GMT) is not another occurrence.
        let next = trigger.next_after(first).unwrap();
        assert_eq!(next, utc(2026, 10, 26, 1, 30, 0));
        assert_eq!(trigger.next_after(utc(2026, 10, 25, 1, 10, 0)), Some(next));
    }

    #[test]
    fn skipped_hour_fires_when_the_clocks_resume() {
        // 29 Mar 2026: London jumps from 01:00 GMT to 02:00 BST.
        let trigger = Trigger::parse("0 30 1 * * *", chrono_tz::Europe::London).unwrap();
        let fired = trigger.next_after(utc(2026, 3, 28, 12, 0, 0)).unwrap();
        assert_eq!(fired, utc(2026, 3, 29, 1, 0, 0));
        assert_eq!(
            trigger.next_after(fired).unwrap(),
            utc(2026, 3, 30, 0, 30, 0)
        );
    }

    #[test]
    fn occurrences_inside_one_gap_collapse_into_one() {
        let trigger = Trigger::parse("0 */15 * * * *", chrono_tz::Europe::London).unwrap();
        let mut t = utc(2026, 3, 29, 0, 40, 0);
        let mut fired = Vec::new();
        for _ in 0..4 {
            t = trigger.next_after(t).unwrap();
            fired.push(t);
        }
        assert_eq!(
            fired,
            vec![
                utc(2026, 3, 29, 0, 45, 0),
                utc(2026, 3, 29, 1, 0, 0),
                utc(2026, 3, 29, 1, 15, 0),
                utc(2026, 3, 29, 1, 30, 0),
            ]
        );
    }

    #[test]
    fn display_names_expression_and_zone() {
        assert_eq!(monday_nine().to_string(), "0 0 9 * * Mon [Europe/London]");
    }
}
