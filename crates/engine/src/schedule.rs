//! Next-fire-time calculation for trigger schedules.
//!
//! [`next_fire_time`] is pure and idempotent: same trigger + same `now`
//! always yields the same instant, and the result is strictly after `now`.
//! Malformed time-of-day strings fall back to 08:00, an inherited and
//! deliberately silent default.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use duewatch_core::{Frequency, Trigger, Weekday};

/// Fallback hour/minute when the configured time of day is unparsable.
const FALLBACK_TIME: (u32, u32) = (8, 0);

/// Parse "HH:MM" (minutes optional) into an (hour, minute) pair.
/// Out-of-range or non-numeric values fall back to 08:00.
pub fn parse_time_of_day(raw: &str) -> (u32, u32) {
    let mut parts = raw.trim().split(':');

    let hour = match parts.next().and_then(|p| p.trim().parse::<u32>().ok()) {
        Some(h) if h < 24 => h,
        _ => return FALLBACK_TIME,
    };
    let minute = match parts.next() {
        None => 0,
        Some(p) => match p.trim().parse::<u32>() {
            Ok(m) if m < 60 => m,
            _ => return FALLBACK_TIME,
        },
    };
    (hour, minute)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is always valid");
    (first_of_next - Duration::days(1)).day()
}

fn at_time(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0)
        .expect("parsed time of day is within range")
        .and_utc()
}

/// Compute the next instant a trigger should fire after `now`.
pub fn next_fire_time(trigger: &Trigger, now: DateTime<Utc>) -> DateTime<Utc> {
    let (hour, minute) = parse_time_of_day(&trigger.time_of_day);
    let today = now.date_naive();

    match &trigger.frequency {
        Frequency::Daily => {
            let candidate = at_time(today, hour, minute);
            if candidate <= now {
                candidate + Duration::days(1)
            } else {
                candidate
            }
        }

        Frequency::Weekly { weekdays } => {
            let candidate = at_time(today, hour, minute);
            if weekdays.is_empty() {
                // Same weekday every week.
                if candidate <= now {
                    candidate + Duration::days(7)
                } else {
                    candidate
                }
            } else {
                let mut offsets: Vec<i64> =
                    weekdays.iter().map(Weekday::offset_from_monday).collect();
                offsets.sort_unstable();
                offsets.dedup();

                let today_offset =
                    Weekday::from_chrono(today.weekday()).offset_from_monday();

                for &offset in &offsets {
                    if offset > today_offset || (offset == today_offset && candidate > now) {
                        return candidate + Duration::days(offset - today_offset);
                    }
                }
                // Nothing left this week: wrap to the earliest configured day.
                candidate + Duration::days((7 - today_offset) + offsets[0])
            }
        }

        Frequency::Monthly { day_of_month } => {
            // Days beyond the month's length clamp to its last day.
            let day = (*day_of_month).clamp(1, days_in_month(today.year(), today.month()));
            let date = NaiveDate::from_ymd_opt(today.year(), today.month(), day)
                .expect("clamped day is valid");
            let candidate = at_time(date, hour, minute);
            if candidate > now {
                return candidate;
            }

            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let day = (*day_of_month).clamp(1, days_in_month(year, month));
            let date = NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid");
            at_time(date, hour, minute)
        }

        Frequency::Interval { hours } => now + Duration::hours((*hours).max(1) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use duewatch_core::Priority;

    fn make_trigger(frequency: Frequency, time_of_day: &str) -> Trigger {
        Trigger {
            id: 1,
            name: "t".to_string(),
            description: String::new(),
            frequency,
            time_of_day: time_of_day.to_string(),
            recipients: vec!["ops@example.com".to_string()],
            priority_filter: Priority::ALL.to_vec(),
            active: true,
            last_run: None,
            next_run: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // -- parse_time_of_day -------------------------------------------------

    #[test]
    fn parses_hour_and_minute() {
        assert_eq!(parse_time_of_day("08:30"), (8, 30));
        assert_eq!(parse_time_of_day("23:59"), (23, 59));
        assert_eq!(parse_time_of_day(" 7:05 "), (7, 5));
    }

    #[test]
    fn bare_hour_means_on_the_hour() {
        assert_eq!(parse_time_of_day("7"), (7, 0));
    }

    #[test]
    fn malformed_time_falls_back_to_eight() {
        assert_eq!(parse_time_of_day(""), (8, 0));
        assert_eq!(parse_time_of_day("abc"), (8, 0));
        assert_eq!(parse_time_of_day("25:00"), (8, 0));
        assert_eq!(parse_time_of_day("10:75"), (8, 0));
    }

    // -- daily -------------------------------------------------------------

    #[test]
    fn daily_before_fire_time_is_today() {
        let trigger = make_trigger(Frequency::Daily, "08:00");
        let now = utc(2026, 8, 6, 7, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 6, 8, 0));
    }

    #[test]
    fn daily_after_fire_time_is_tomorrow() {
        let trigger = make_trigger(Frequency::Daily, "08:00");
        let now = utc(2026, 8, 6, 9, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 7, 8, 0));
    }

    #[test]
    fn daily_with_malformed_time_uses_fallback() {
        let trigger = make_trigger(Frequency::Daily, "not-a-time");
        let now = utc(2026, 8, 6, 9, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 7, 8, 0));
    }

    // -- weekly ------------------------------------------------------------

    #[test]
    fn weekly_upcoming_day_this_week() {
        // 2026-08-04 is a Tuesday; Wednesday is the 5th.
        let trigger = make_trigger(
            Frequency::Weekly {
                weekdays: vec![Weekday::Wednesday],
            },
            "08:00",
        );
        let now = utc(2026, 8, 4, 15, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 5, 8, 0));
    }

    #[test]
    fn weekly_same_day_after_time_wraps_a_week() {
        // 2026-08-05 is a Wednesday.
        let trigger = make_trigger(
            Frequency::Weekly {
                weekdays: vec![Weekday::Wednesday],
            },
            "08:00",
        );
        let now = utc(2026, 8, 5, 9, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 12, 8, 0));
    }

    #[test]
    fn weekly_same_day_before_time_is_today() {
        let trigger = make_trigger(
            Frequency::Weekly {
                weekdays: vec![Weekday::Wednesday],
            },
            "08:00",
        );
        let now = utc(2026, 8, 5, 7, 30);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 5, 8, 0));
    }

    #[test]
    fn weekly_wraps_to_earliest_configured_day() {
        // Friday the 7th, configured Monday+Tuesday: next is Monday the 10th.
        let trigger = make_trigger(
            Frequency::Weekly {
                weekdays: vec![Weekday::Tuesday, Weekday::Monday],
            },
            "08:00",
        );
        let now = utc(2026, 8, 7, 12, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 10, 8, 0));
    }

    #[test]
    fn weekly_empty_set_advances_seven_days() {
        let trigger = make_trigger(Frequency::Weekly { weekdays: vec![] }, "08:00");
        let now = utc(2026, 8, 5, 9, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 12, 8, 0));
    }

    // -- monthly -----------------------------------------------------------

    #[test]
    fn monthly_upcoming_day_this_month() {
        let trigger = make_trigger(Frequency::Monthly { day_of_month: 15 }, "08:00");
        let now = utc(2026, 8, 6, 12, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 15, 8, 0));
    }

    #[test]
    fn monthly_past_day_rolls_to_next_month() {
        let trigger = make_trigger(Frequency::Monthly { day_of_month: 1 }, "08:00");
        let now = utc(2026, 8, 6, 12, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 9, 1, 8, 0));
    }

    #[test]
    fn monthly_december_rolls_to_january() {
        let trigger = make_trigger(Frequency::Monthly { day_of_month: 1 }, "08:00");
        let now = utc(2026, 12, 15, 12, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2027, 1, 1, 8, 0));
    }

    #[test]
    fn monthly_day_beyond_month_length_clamps() {
        let trigger = make_trigger(Frequency::Monthly { day_of_month: 31 }, "08:00");
        // September has 30 days.
        let now = utc(2026, 9, 1, 12, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 9, 30, 8, 0));
    }

    #[test]
    fn monthly_clamps_february_leap_aware() {
        let trigger = make_trigger(Frequency::Monthly { day_of_month: 31 }, "08:00");
        assert_eq!(
            next_fire_time(&trigger, utc(2026, 2, 1, 12, 0)),
            utc(2026, 2, 28, 8, 0)
        );
        // 2028 is a leap year.
        assert_eq!(
            next_fire_time(&trigger, utc(2028, 2, 1, 12, 0)),
            utc(2028, 2, 29, 8, 0)
        );
    }

    #[test]
    fn monthly_clamped_day_already_past_rolls_forward() {
        let trigger = make_trigger(Frequency::Monthly { day_of_month: 31 }, "08:00");
        // Feb 28 09:00 is past the clamped Feb slot; next is March 31.
        let now = utc(2026, 2, 28, 9, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 3, 31, 8, 0));
    }

    // -- interval ----------------------------------------------------------

    #[test]
    fn interval_adds_hours_ignoring_time_of_day() {
        let trigger = make_trigger(Frequency::Interval { hours: 6 }, "08:00");
        let now = utc(2026, 8, 6, 13, 45);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 6, 19, 45));
    }

    #[test]
    fn interval_zero_hours_is_treated_as_one() {
        let trigger = make_trigger(Frequency::Interval { hours: 0 }, "08:00");
        let now = utc(2026, 8, 6, 13, 0);
        assert_eq!(next_fire_time(&trigger, now), utc(2026, 8, 6, 14, 0));
    }

    // -- idempotence -------------------------------------------------------

    #[test]
    fn result_is_idempotent_and_strictly_future() {
        let triggers = vec![
            make_trigger(Frequency::Daily, "08:00"),
            make_trigger(
                Frequency::Weekly {
                    weekdays: vec![Weekday::Monday],
                },
                "06:30",
            ),
            make_trigger(Frequency::Monthly { day_of_month: 31 }, "22:00"),
            make_trigger(Frequency::Interval { hours: 2 }, "ignored"),
        ];
        let now = utc(2026, 8, 6, 8, 0);
        for trigger in &triggers {
            let first = next_fire_time(trigger, now);
            let second = next_fire_time(trigger, now);
            assert_eq!(first, second);
            assert!(first > now);
        }
    }
}
