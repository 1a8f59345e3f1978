use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};

pub const SCHEDULE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Drops sub-second precision; scheduled times are whole seconds.
pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(0)
}

/// Renders a schedule time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_schedule(at: DateTime<Utc>) -> String {
    at.format(SCHEDULE_FORMAT).to_string()
}

pub fn parse_schedule(value: &str) -> AppResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, SCHEDULE_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| AppError::InvalidInput(format!("Invalid schedule time '{}': {}", value, e)))
}

/// Converts an epoch-seconds value (possibly fractional) to UTC.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.trunc() as i64;
    let nanos = ((seconds - seconds.trunc()) * 1_000_000_000.0).round() as u32;
    Utc.timestamp_opt(whole, nanos.min(999_999_999)).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_strings_have_no_fraction() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::milliseconds(731);
        assert_eq!(format_schedule(truncate_to_seconds(at)), "2024-03-09T14:05:07Z");
        assert_eq!(format_schedule(at), "2024-03-09T14:05:07Z");
    }

    #[test]
    fn parse_schedule_accepts_formatted_value() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(parse_schedule("2024-03-09T14:05:07Z").unwrap(), at);
        assert!(parse_schedule("2024-03-09 14:05").is_err());
    }

    #[test]
    fn epoch_seconds_with_fraction() {
        let at = from_epoch_seconds(1_700_000_000.5).unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(at.timestamp_subsec_millis(), 500);
        assert!(from_epoch_seconds(f64::NAN).is_none());
    }
}
