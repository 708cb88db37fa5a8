//! Time flag parsing: RFC3339 timestamps and short durations like `60m`.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::error::{BeelineError, Result};

/// An explicit timestamp wins over a relative `--days` cutoff.
pub fn parse_time_flag(value: Option<&str>, days: u32) -> Result<Option<DateTime<Utc>>> {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        return parse_time(value).map(Some);
    }
    if days > 0 {
        return Ok(Some(Utc::now() - chrono::Duration::days(i64::from(days))));
    }
    Ok(None)
}

pub fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| BeelineError::InvalidArgument(format!("invalid time {value:?}: use RFC3339")))
}

/// Parse a duration like `90s`, `60m`, `2h`, or `1d`.
pub fn parse_window(value: Option<&str>) -> Result<Option<Duration>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let invalid = || {
        BeelineError::InvalidArgument(format!(
            "invalid duration {value:?}: use a number with s, m, h, or d"
        ))
    };

    if !value.is_ascii() {
        return Err(invalid());
    }
    let (amount, unit) = value.split_at(value.len() - 1);
    let seconds_per_unit: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return Err(invalid()),
    };
    let amount: f64 = amount.trim().parse().map_err(|_| invalid())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }

    Ok(Some(Duration::from_secs_f64(
        amount * seconds_per_unit as f64,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window(None).unwrap(), None);
        assert_eq!(parse_window(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_window(Some("60m")).unwrap(),
            Some(Duration::from_secs(3600))
        );
        assert_eq!(
            parse_window(Some("1.5h")).unwrap(),
            Some(Duration::from_secs(5400))
        );
        assert!(parse_window(Some("oops")).is_err());
        assert!(parse_window(Some("10")).is_err());
    }

    #[test]
    fn test_parse_time_flag() {
        let ts = parse_time_flag(Some("2024-03-01T12:00:00Z"), 7).unwrap().unwrap();
        assert_eq!(ts.timestamp(), 1_709_294_400);

        assert!(parse_time_flag(None, 0).unwrap().is_none());
        assert!(parse_time_flag(None, 7).unwrap().is_some());
        assert!(parse_time_flag(Some("yesterday"), 0).is_err());
    }
}
