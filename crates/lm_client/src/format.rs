use chrono::{DateTime, Utc};

fn plural(count: i64, unit: &str) -> String {
    format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
}

/// "just now", "N min ago", "N hrs ago" or "N days ago", relative to `now`.
pub fn format_relative_time(created_at: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed_ms = (now - *created_at).num_milliseconds() as f64;
    let minutes = (elapsed_ms / 60_000.0).round() as i64;
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }

    let hours = (minutes as f64 / 60.0).round() as i64;
    if hours < 24 {
        return plural(hours, "hr");
    }

    let days = (hours as f64 / 24.0).round() as i64;
    plural(days, "day")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(duration: Duration) -> String {
        let now = Utc::now();
        format_relative_time(&(now - duration), now)
    }

    #[test]
    fn test_relative_buckets() {
        assert_eq!(ago(Duration::seconds(20)), "just now");
        assert_eq!(ago(Duration::seconds(40)), "1 min ago");
        assert_eq!(ago(Duration::minutes(1)), "1 min ago");
        assert_eq!(ago(Duration::minutes(59)), "59 min ago");
        assert_eq!(ago(Duration::minutes(60)), "1 hr ago");
        assert_eq!(ago(Duration::minutes(150)), "3 hrs ago");
        assert_eq!(ago(Duration::hours(23)), "23 hrs ago");
        assert_eq!(ago(Duration::hours(24)), "1 day ago");
        assert_eq!(ago(Duration::days(9)), "9 days ago");
    }

    #[test]
    fn test_future_timestamps_read_as_just_now() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&(now + Duration::hours(2)), now), "just now");
    }
}
