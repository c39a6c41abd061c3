use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::db::models::SessionStatus;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Current instant at the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_status(value: &str) -> Result<SessionStatus> {
    match value {
        "Pending" => Ok(SessionStatus::Pending),
        "Active" => Ok(SessionStatus::Active),
        "Closed" => Ok(SessionStatus::Closed),
        other => Err(anyhow!("unknown session status {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let whole = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = whole + chrono::Duration::microseconds(1500);
        let a = format_datetime(&whole);
        let b = format_datetime(&later);
        assert_eq!(a, "2024-03-01T12:00:00.000000Z");
        assert!(a < b);
        assert_eq!(parse_datetime(&b, "test").unwrap(), later);
    }

    #[test]
    fn rejects_negative_counters() {
        assert!(to_u64(-1, "focus_secs").is_err());
        assert_eq!(to_u64(5, "focus_secs").unwrap(), 5);
    }

    #[test]
    fn parses_known_statuses_only() {
        assert_eq!(parse_status("Active").unwrap(), SessionStatus::Active);
        assert!(parse_status("Running").is_err());
    }
}
