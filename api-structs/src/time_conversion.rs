use chrono::{DateTime, Duration, Utc};

/// Window used when a request names neither `start`/`end` nor `statsPeriod`
pub const DEFAULT_STATS_PERIOD: &str = "90d";

/// Parses periods like `30m`, `24h`, `14d` or `2w`. A bare number is read as seconds.
pub fn parse_stats_period(period: &str) -> Option<Duration> {
    let period = period.trim();
    let (amount, unit) = match period.find(|c: char| !c.is_ascii_digit()) {
        None => (period, "s"),
        Some(unit_start) => period.split_at(unit_start),
    };
    let amount: i64 = amount.parse().ok()?;
    match unit {
        "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => None,
    }
}

/// Resolves the time window of a query, an explicit `start`/`end` pair wins over `statsPeriod`
pub fn resolve_time_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    stats_period: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if start > end {
                return Err(format!("start {start} is after end {end}"));
            }
            Ok((start, end))
        }
        (None, None) => {
            let raw_period = stats_period.unwrap_or(DEFAULT_STATS_PERIOD);
            let start = parse_stats_period(raw_period)
                .and_then(|period| now.checked_sub_signed(period))
                .ok_or_else(|| format!("Invalid statsPeriod: {raw_period}"))?;
            Ok((start, now))
        }
        _ => Err("start and end must be provided together".to_string()),
    }
}

#[test]
fn parses_known_units() {
    assert_eq!(parse_stats_period("24h"), Duration::try_hours(24));
    assert_eq!(parse_stats_period("14d"), Duration::try_days(14));
    assert_eq!(parse_stats_period("90"), Duration::try_seconds(90));
    assert_eq!(parse_stats_period("2w"), Duration::try_weeks(2));
    assert_eq!(parse_stats_period("1y"), None);
    assert_eq!(parse_stats_period("h"), None);
}

#[test]
fn time_window_prefers_explicit_range() {
    let now = Utc::now();
    let start = now - Duration::try_hours(1).unwrap();
    assert_eq!(
        resolve_time_window(Some(start), Some(now), Some("14d"), now),
        Ok((start, now))
    );
    assert!(resolve_time_window(Some(now), Some(start), None, now).is_err());
    assert!(resolve_time_window(Some(start), None, None, now).is_err());
    let (default_start, _) = resolve_time_window(None, None, None, now).unwrap();
    assert_eq!(now - default_start, Duration::try_days(90).unwrap());
}

#[test]
fn period_reaching_before_representable_dates_is_rejected() {
    let now = Utc::now();
    assert_eq!(
        resolve_time_window(None, None, Some("100000000d"), now),
        Err("Invalid statsPeriod: 100000000d".to_string())
    );
}
