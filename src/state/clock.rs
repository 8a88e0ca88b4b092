use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Time a court has been occupied, as zero-padded `MM:SS`.
///
/// Minutes are not wrapped at the hour. A free court reads `00:00`, and so does
/// a start time in the future (clock skew between writers).
pub fn elapsed(start_time: Option<i64>, now: i64) -> String {
    let Some(start) = start_time else {
        return "00:00".to_string();
    };
    let seconds = now.saturating_sub(start).max(0) / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_courts_read_zero() {
        assert_eq!(elapsed(None, 123_456), "00:00");
    }

    #[test]
    fn seconds_are_floored() {
        assert_eq!(elapsed(Some(1_000), 1_999), "00:00");
        assert_eq!(elapsed(Some(0), 61_500), "01:01");
    }

    #[test]
    fn minutes_are_not_wrapped() {
        assert_eq!(elapsed(Some(0), 75 * 60_000 + 5_000), "75:05");
        assert_eq!(elapsed(Some(0), 1_000 * 60_000), "1000:00");
    }

    #[test]
    fn future_start_is_clamped() {
        assert_eq!(elapsed(Some(10_000), 2_000), "00:00");
    }
}
