/// Formats a duration as `M:SS`, or `Ns` below one minute.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_durations_use_seconds() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
    }

    #[test]
    fn long_durations_use_minutes() {
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(605), "10:05");
    }
}
