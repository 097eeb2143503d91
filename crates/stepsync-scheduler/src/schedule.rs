use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;

use crate::types::DailyTrigger;

/// Compute the next UTC fire time for `trigger` strictly *after* `from`,
/// with HH:MM read as wall-clock time in `tz`.
///
/// A wall-clock time that does not exist on some day (DST gap) is skipped
/// for that day. Returns `None` only if no candidate exists in the next
/// three local days.
pub fn next_fire_after(trigger: DailyTrigger, from: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let today = from.with_timezone(&tz).date_naive();
    (0..=2)
        .filter_map(|offset| {
            let naive = (today + Duration::days(offset))
                .and_hms_opt(trigger.hour.into(), trigger.minute.into(), 0)?;
            tz.from_local_datetime(&naive).earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .find(|dt| *dt > from)
}

/// Most recent occurrence at or before `now`, walking forward from a known
/// occurrence `scheduled`. Used to coalesce a backlog into one run.
pub fn latest_occurrence(
    trigger: DailyTrigger,
    scheduled: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    let mut latest = scheduled;
    while let Some(next) = next_fire_after(trigger, latest, tz) {
        if next > now {
            break;
        }
        latest = next;
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America::New_York, Asia::Shanghai};

    fn trigger(hour: u8, minute: u8) -> DailyTrigger {
        DailyTrigger::new(hour, minute).unwrap()
    }

    fn shanghai(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Shanghai
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn later_today_in_local_time() {
        let from = shanghai(2026, 3, 1, 0, 0);
        let next = next_fire_after(trigger(0, 5), from, Shanghai).unwrap();
        assert_eq!(next, shanghai(2026, 3, 1, 0, 5));
        // 00:05 Shanghai is 16:05 UTC the previous day.
        assert_eq!(next.to_rfc3339(), "2026-02-28T16:05:00+00:00");
    }

    #[test]
    fn passed_today_moves_to_tomorrow() {
        let from = shanghai(2026, 3, 1, 9, 0);
        let next = next_fire_after(trigger(8, 30), from, Shanghai).unwrap();
        assert_eq!(next, shanghai(2026, 3, 2, 8, 30));
    }

    #[test]
    fn exact_fire_time_is_not_repeated() {
        let from = shanghai(2026, 3, 1, 8, 30);
        let next = next_fire_after(trigger(8, 30), from, Shanghai).unwrap();
        assert_eq!(next, shanghai(2026, 3, 2, 8, 30));
    }

    #[test]
    fn local_day_differs_from_utc_day() {
        // 23:00 UTC on Feb 28 is already 07:00 Mar 1 in Shanghai.
        let from = Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap();
        let next = next_fire_after(trigger(6, 0), from, Shanghai).unwrap();
        assert_eq!(next, shanghai(2026, 3, 2, 6, 0));
    }

    #[test]
    fn dst_gap_skips_to_next_day() {
        // 02:30 does not exist in New York on 2026-03-08.
        let from = New_York
            .with_ymd_and_hms(2026, 3, 8, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let next = next_fire_after(trigger(2, 30), from, New_York).unwrap();
        let expected = New_York
            .with_ymd_and_hms(2026, 3, 9, 2, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(next, expected);
    }

    #[test]
    fn latest_occurrence_collapses_backlog() {
        let scheduled = shanghai(2026, 2, 26, 11, 55);
        let now = shanghai(2026, 3, 2, 12, 0);
        let latest = latest_occurrence(trigger(11, 55), scheduled, now, Shanghai);
        assert_eq!(latest, shanghai(2026, 3, 2, 11, 55));
    }

    #[test]
    fn latest_occurrence_without_backlog_is_scheduled_time() {
        let scheduled = shanghai(2026, 3, 2, 11, 55);
        let now = shanghai(2026, 3, 2, 11, 56);
        assert_eq!(latest_occurrence(trigger(11, 55), scheduled, now, Shanghai), scheduled);
    }
}
