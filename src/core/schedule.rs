// src/core/schedule.rs

//! Computes when an automation task should run next.
//!
//! The calculator is a pure function of the schedule and "now". It is generic
//! over the time zone so the binary can use `Local` while tests pin `Utc` or a
//! fixed offset.

use chrono::{DateTime, Duration, NaiveTime, TimeZone};

use crate::models::Schedule;

/// Returns the next run time for `schedule`, strictly after `now`.
///
/// * `hourly` / unrecognised schedules: `now + 1h`.
/// * `daily`: `now + 24h`, or today at `explicit_time` (rolled forward by 24h
///   until it is in the future) when a time is given.
/// * `weekly`: `now + 7 * 24h`.
/// * `@HH:MM`: today at that time, rolled forward the same way.
///
/// Malformed time fragments are read leniently: each component that does not
/// start with digits counts as `0`. A time without exactly one `:` separator is
/// ignored and the schedule's plain fallback applies.
pub fn next_run<Tz: TimeZone>(
    schedule: &Schedule,
    explicit_time: Option<&str>,
    now: &DateTime<Tz>,
) -> DateTime<Tz> {
    match schedule {
        Schedule::Hourly => now.clone() + Duration::hours(1),
        Schedule::Daily => explicit_time
            .and_then(parse_time_of_day)
            .map(|offset| next_time_of_day(offset, now))
            .unwrap_or_else(|| now.clone() + Duration::hours(24)),
        Schedule::Weekly => now.clone() + Duration::days(7),
        Schedule::At(time) => parse_time_of_day(time)
            .map(|offset| next_time_of_day(offset, now))
            .unwrap_or_else(|| now.clone() + Duration::hours(1)),
        Schedule::Other(raw) => {
            log::debug!("Unrecognised schedule '{}', falling back to hourly.", raw);
            now.clone() + Duration::hours(1)
        }
    }
}

/// Splits `HH:MM` into an offset from midnight. Out-of-range values are kept
/// as-is (`25:00` is 01:00 the next day), matching plain date arithmetic.
fn parse_time_of_day(raw: &str) -> Option<Duration> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    if minutes.contains(':') {
        return None;
    }
    Some(Duration::hours(lenient_int(hours)) + Duration::minutes(lenient_int(minutes)))
}

/// Reads an optional sign followed by leading digits; anything else is `0`.
fn lenient_int(raw: &str) -> i64 {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits
        .get(..end)
        .and_then(|number| number.parse::<i64>().ok())
        // Clamp absurd values so the duration arithmetic below cannot overflow.
        .map_or(0, |value| sign * value.min(1_000_000))
}

/// Today at midnight + `offset`, pushed forward in whole days until it is
/// strictly after `now`.
fn next_time_of_day<Tz: TimeZone>(offset: Duration, now: &DateTime<Tz>) -> DateTime<Tz> {
    let naive = now.date_naive().and_time(NaiveTime::MIN) + offset;
    let Some(mut candidate) = resolve_local(&now.timezone(), naive) else {
        log::warn!("Local time {} does not exist, using hourly fallback.", naive);
        return now.clone() + Duration::hours(1);
    };

    if candidate <= *now {
        // Jump straight to the right day instead of looping one day at a time.
        let behind = now.clone().signed_duration_since(candidate.clone());
        let days = behind.num_days() + 1;
        candidate = candidate + Duration::days(days);
        while candidate <= *now {
            candidate = candidate + Duration::hours(24);
        }
    }
    candidate
}

/// Maps a wall-clock time into the zone. Ambiguous times (DST fall-back) take
/// the earlier instant; skipped times (DST spring-forward) move one hour later.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: chrono::NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_hourly_daily_weekly_offsets() {
        let now = at(2024, 1, 1, 10, 0);
        assert_eq!(next_run(&Schedule::Hourly, None, &now), at(2024, 1, 1, 11, 0));
        assert_eq!(next_run(&Schedule::Daily, None, &now), at(2024, 1, 2, 10, 0));
        assert_eq!(next_run(&Schedule::Weekly, None, &now), at(2024, 1, 8, 10, 0));
    }

    #[test]
    fn test_daily_with_time_rolls_over_when_passed() {
        let now = at(2024, 1, 1, 10, 0);
        assert_eq!(
            next_run(&Schedule::Daily, Some("09:00"), &now),
            at(2024, 1, 2, 9, 0)
        );
    }

    #[test]
    fn test_daily_with_time_stays_today_when_ahead() {
        let now = at(2024, 1, 1, 8, 0);
        assert_eq!(
            next_run(&Schedule::Daily, Some("09:00"), &now),
            at(2024, 1, 1, 9, 0)
        );
    }

    #[test]
    fn test_time_equal_to_now_is_pushed_to_tomorrow() {
        let now = at(2024, 1, 1, 9, 0);
        assert_eq!(
            next_run(&Schedule::At("09:00".to_string()), None, &now),
            at(2024, 1, 2, 9, 0)
        );
    }

    #[test]
    fn test_at_schedule_uses_today_or_tomorrow() {
        let schedule = Schedule::At("23:00".to_string());
        assert_eq!(next_run(&schedule, None, &at(2024, 3, 5, 7, 30)), at(2024, 3, 5, 23, 0));
        assert_eq!(next_run(&schedule, None, &at(2024, 3, 5, 23, 30)), at(2024, 3, 6, 23, 0));
    }

    #[test]
    fn test_at_schedule_respects_the_zone_of_now() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let next = next_run(&Schedule::At("09:00".to_string()), None, &now);
        assert_eq!(next, tz.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_unknown_schedule_falls_back_to_hourly() {
        let now = at(2024, 1, 1, 10, 0);
        let schedule = Schedule::Other("fortnightly".to_string());
        assert_eq!(next_run(&schedule, None, &now), at(2024, 1, 1, 11, 0));
    }

    #[test]
    fn test_lenient_time_parsing() {
        let now = at(2024, 1, 1, 0, 30);
        // Non-numeric minutes read as 0.
        assert_eq!(
            next_run(&Schedule::At("07:xx".to_string()), None, &now),
            at(2024, 1, 1, 7, 0)
        );
        // Trailing garbage after the digits is ignored.
        assert_eq!(
            next_run(&Schedule::Daily, Some("9am:15"), &now),
            at(2024, 1, 1, 9, 15)
        );
        // No separator: plain fallback for the schedule kind.
        assert_eq!(
            next_run(&Schedule::At("0900".to_string()), None, &now),
            at(2024, 1, 1, 1, 30)
        );
        assert_eq!(
            next_run(&Schedule::Daily, Some("0900"), &now),
            at(2024, 1, 2, 0, 30)
        );
    }

    #[test]
    fn test_negative_and_overflowing_times_still_land_in_the_future() {
        let now = at(2024, 1, 1, 20, 0);
        let negative = next_run(&Schedule::At("-5:00".to_string()), None, &now);
        assert!(negative > now);
        assert_eq!(negative, at(2024, 1, 2, 19, 0));

        let overflow = next_run(&Schedule::At("25:00".to_string()), None, &now);
        assert_eq!(overflow, at(2024, 1, 2, 1, 0));
    }

    #[test]
    fn test_next_run_is_always_strictly_after_now() {
        let schedules = [
            Schedule::Hourly,
            Schedule::Daily,
            Schedule::Weekly,
            Schedule::At("00:00".to_string()),
            Schedule::At("12:34".to_string()),
            Schedule::At("23:59".to_string()),
            Schedule::Other("garbage".to_string()),
        ];
        for hour in 0..24 {
            for minute in [0, 1, 29, 59] {
                let now = at(2024, 2, 28, hour, minute);
                for schedule in &schedules {
                    for time in [None, Some("00:00"), Some("12:34"), Some("23:59")] {
                        let next = next_run(schedule, time, &now);
                        assert!(next > now, "{schedule} {time:?} at {now} gave {next}");
                    }
                }
            }
        }
    }
}
