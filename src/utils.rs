/// Time helpers for logging and station timestamps
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to the default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Convert a time::Duration to whole seconds, negative spans count as zero
pub fn duration_to_seconds(duration: Duration) -> u64 {
    u64::try_from(duration.whole_seconds()).unwrap_or(0)
}

/// Instant from signed 32-bit POSIX seconds as sent by station loggers
pub fn from_posix(seconds: i32) -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::seconds(i64::from(seconds))
}

/// POSIX seconds for `dt`, saturating outside the 32-bit range
pub fn to_posix(dt: &OffsetDateTime) -> i32 {
    let seconds = dt.unix_timestamp();
    i32::try_from(seconds).unwrap_or(if seconds < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_for_logs() {
        let dt = datetime!(2024-03-07 09:05:01 UTC);
        assert_eq!(format_datetime(&dt), "07.03.2024 - 09:05:01");
    }

    #[test]
    fn negative_durations_are_zero_seconds() {
        assert_eq!(duration_to_seconds(Duration::seconds(90)), 90);
        assert_eq!(duration_to_seconds(Duration::seconds(-5)), 0);
    }

    #[test]
    fn posix_seconds_round_trip() {
        let dt = from_posix(1_700_000_000);
        assert_eq!(dt, datetime!(2023-11-14 22:13:20 UTC));
        assert_eq!(to_posix(&dt), 1_700_000_000);
        assert_eq!(from_posix(0), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(to_posix(&from_posix(i32::MIN)), i32::MIN);
    }

    #[test]
    fn posix_conversion_saturates() {
        let far = datetime!(2200-01-01 00:00 UTC);
        assert_eq!(to_posix(&far), i32::MAX);
    }
}
