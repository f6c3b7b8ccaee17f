//! Clock-time arithmetic over "HH:MM" 24-hour strings. Times are always
//! converted to integer minute offsets before comparison; lexical string
//! ordering is never trusted across hour boundaries.

/// Arrival later than this many minutes past the scheduled start counts
/// as late.
pub const LATE_GRACE_MINUTES: i32 = 5;

/// Parses a zero-padded "HH:MM" 24-hour clock time into its minute offset
/// from midnight. Returns `None` for anything malformed.
pub fn minute_of_day(value: &str) -> Option<i32> {
    let (hour_str, minute_str) = value.trim().split_once(':')?;
    let hour: i32 = hour_str.parse().ok()?;
    let minute: i32 = minute_str.parse().ok()?;
    if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
        return None;
    }
    Some(hour * 60 + minute)
}

/// Signed minutes of `actual - scheduled`: negative means early, positive
/// late. Empty or malformed input on either side means "no data" and
/// yields 0 rather than an error.
pub fn minutes_difference(scheduled: &str, actual: &str) -> i32 {
    match (minute_of_day(scheduled), minute_of_day(actual)) {
        (Some(scheduled_minutes), Some(actual_minutes)) => actual_minutes - scheduled_minutes,
        _ => 0,
    }
}

pub fn is_late(minutes_diff: i32) -> bool {
    minutes_diff > LATE_GRACE_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn minute_of_day_crosses_hour_boundaries_numerically() {
        assert_eq!(minute_of_day("09:55"), Some(595));
        assert_eq!(minute_of_day("13:20"), Some(800));
        assert!(minute_of_day("09:55") < minute_of_day("13:20"));
    }

    #[test]
    fn minute_of_day_rejects_malformed_input() {
        assert_eq!(minute_of_day(""), None);
        assert_eq!(minute_of_day("9am"), None);
        assert_eq!(minute_of_day("24:00"), None);
        assert_eq!(minute_of_day("12:60"), None);
        assert_eq!(minute_of_day("12:30:15"), None);
    }

    #[test]
    fn minutes_difference_signed() {
        assert_eq!(minutes_difference("09:55", "10:05"), 10);
        assert_eq!(minutes_difference("09:55", "09:50"), -5);
        assert_eq!(minutes_difference("09:55", "09:55"), 0);
    }

    #[test]
    fn minutes_difference_missing_input_is_no_data() {
        assert_eq!(minutes_difference("", "10:05"), 0);
        assert_eq!(minutes_difference("09:55", ""), 0);
        assert_eq!(minutes_difference("garbage", "10:05"), 0);
    }

    #[test]
    fn is_late_only_beyond_grace() {
        assert!(!is_late(0));
        assert!(!is_late(5));
        assert!(is_late(6));
        assert!(!is_late(-10));
    }

    proptest! {
        #[test]
        fn minutes_difference_is_antisymmetric(
            hour_a in 0u8..24u8,
            minute_a in 0u8..60u8,
            hour_b in 0u8..24u8,
            minute_b in 0u8..60u8
        ) {
            let a = format!("{hour_a:02}:{minute_a:02}");
            let b = format!("{hour_b:02}:{minute_b:02}");
            prop_assert_eq!(minutes_difference(&a, &b), -minutes_difference(&b, &a));
            prop_assert_eq!(
                is_late(minutes_difference(&a, &b)),
                minutes_difference(&a, &b) > LATE_GRACE_MINUTES
            );
        }
    }
}
