use chrono::{DateTime, Duration, Utc};
use pkg_constants::countdown::{MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

/// Human-readable remaining time.
///
/// Positive values render at the two or three most significant units
/// (`"2d 3h 4m"`, `"1h 1m"`, `"1m 30s"`). Zero and negative values are
/// rendered as `"Overdue by ..."` using the magnitude.
pub fn format_remaining(ms: i64) -> String {
    if ms <= 0 {
        return format!("Overdue by {}", format_magnitude(ms.unsigned_abs()));
    }
    format_magnitude(ms.unsigned_abs())
}

fn format_magnitude(ms: u64) -> String {
    let days = ms / MS_PER_DAY as u64;
    let rem = ms % MS_PER_DAY as u64;
    let hours = rem / MS_PER_HOUR as u64;
    let rem = rem % MS_PER_HOUR as u64;
    let minutes = rem / MS_PER_MINUTE as u64;
    let rem = rem % MS_PER_MINUTE as u64;
    let seconds = rem / MS_PER_SECOND as u64;

    if days >= 1 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours >= 1 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

/// Share of the lease period already elapsed, clamped to `0.0..=100.0`.
///
/// A zero-length or inverted period (`end <= start`) is 100 once `now`
/// reaches `start` and 0 before it.
pub fn percent_complete(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    if end <= start {
        return if now >= start { 100.0 } else { 0.0 };
    }
    let total = span_ms(end - start);
    let elapsed = span_ms(now - start);
    if total <= 0.0 {
        return if elapsed >= 0.0 { 100.0 } else { 0.0 };
    }
    ((elapsed / total) * 100.0).clamp(0.0, 100.0)
}

/// Milliseconds as a float, keeping sub-millisecond precision when it fits.
fn span_ms(d: Duration) -> f64 {
    match d.num_nanoseconds() {
        Some(ns) => ns as f64 / 1_000_000.0,
        None => d.num_milliseconds() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_boundaries() {
        assert_eq!(format_remaining(0), "Overdue by 0m 0s");
        assert_eq!(format_remaining(90_000), "1m 30s");
        assert_eq!(format_remaining(3_700_000), "1h 1m");
        assert_eq!(format_remaining(-3_600_000), "Overdue by 1h 0m");
    }

    #[test]
    fn test_format_days() {
        // 2d 3h 4m 5s
        let ms = 2 * MS_PER_DAY + 3 * MS_PER_HOUR + 4 * MS_PER_MINUTE + 5 * MS_PER_SECOND;
        assert_eq!(format_remaining(ms), "2d 3h 4m");
        assert_eq!(format_remaining(-ms), "Overdue by 2d 3h 4m");
        assert_eq!(format_remaining(MS_PER_DAY), "1d 0h 0m");
    }

    #[test]
    fn test_format_sub_second_and_truncation() {
        assert_eq!(format_remaining(999), "0m 0s");
        assert_eq!(format_remaining(59_999), "0m 59s");
        assert_eq!(format_remaining(MS_PER_HOUR - 1), "59m 59s");
        assert_eq!(format_remaining(-1_500), "Overdue by 0m 1s");
    }

    #[test]
    fn test_format_extremes_do_not_panic() {
        assert!(format_remaining(i64::MIN).starts_with("Overdue by "));
        assert!(format_remaining(i64::MAX).ends_with('m'));
    }

    #[test]
    fn test_percent_midpoint() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = start + Duration::hours(2);
        let now = start + Duration::hours(1);
        assert!((percent_complete(now, start, end) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_percent_clamped() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(3);
        assert_eq!(percent_complete(start - Duration::days(1), start, end), 0.0);
        assert_eq!(percent_complete(end + Duration::days(1), start, end), 100.0);
    }

    #[test]
    fn test_percent_degenerate_lease() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        // zero-length
        assert_eq!(percent_complete(start, start, start), 100.0);
        assert_eq!(percent_complete(start - Duration::seconds(1), start, start), 0.0);
        // inverted
        let end = start - Duration::hours(4);
        assert_eq!(percent_complete(start + Duration::hours(1), start, end), 100.0);
        assert_eq!(percent_complete(end, start, end), 0.0);
    }

    #[test]
    fn test_percent_sub_millisecond_lease() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = start + Duration::microseconds(500);
        let p = percent_complete(start + Duration::microseconds(200), start, end);
        assert!((p - 40.0).abs() < 1e-9, "got {}", p);
        assert_eq!(percent_complete(start - Duration::microseconds(1), start, end), 0.0);
        assert_eq!(percent_complete(end + Duration::microseconds(1), start, end), 100.0);
        assert_eq!(
            percent_complete(start, start, start + Duration::nanoseconds(1)),
            0.0
        );
    }

    #[test]
    fn test_percent_always_in_bounds() {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let offsets = [-1_000_000i64, -3_600, -1, 0, 1, 59, 3_600, 86_400, 10_000_000];
        for s in offsets {
            for e in offsets {
                for n in offsets {
                    let start = base + Duration::seconds(s);
                    let end = base + Duration::seconds(e);
                    let now = base + Duration::seconds(n);
                    let p = percent_complete(now, start, end);
                    assert!(
                        (0.0..=100.0).contains(&p),
                        "percent {} out of bounds for start={} end={} now={}",
                        p,
                        s,
                        e,
                        n
                    );
                }
            }
        }
    }
}
