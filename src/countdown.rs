//! Time left until a replay's scheduled start.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, NaiveTime};

/// Parses an `HH:MM` time of day.
pub fn parse_scheduled_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("scheduled time '{value}' is not a valid HH:MM time"))
}

/// Seconds from `now` until `scheduled` on the same day, or `None` once that
/// moment has passed.
pub fn seconds_until_start(scheduled: &str, now: NaiveDateTime) -> Result<Option<u64>> {
    let start = now.date().and_time(parse_scheduled_time(scheduled)?);
    let remaining = (start - now).num_seconds();
    Ok((remaining > 0).then_some(remaining as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    #[test]
    fn counts_down_to_later_time() {
        assert_eq!(seconds_until_start("18:30", at(18, 0, 0)).unwrap(), Some(1800));
        assert_eq!(seconds_until_start("18:30", at(18, 29, 59)).unwrap(), Some(1));
    }

    #[test]
    fn no_countdown_once_started() {
        assert_eq!(seconds_until_start("18:30", at(18, 30, 0)).unwrap(), None);
        assert_eq!(seconds_until_start("08:00", at(18, 30, 0)).unwrap(), None);
    }

    #[test]
    fn malformed_time_is_an_error() {
        assert!(seconds_until_start("25:99", at(8, 0, 0)).is_err());
        assert!(parse_scheduled_time("soon").is_err());
        assert!(parse_scheduled_time(" 07:05 ").is_ok());
    }
}
